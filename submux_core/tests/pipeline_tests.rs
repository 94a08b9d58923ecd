mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::{FakeChat, FakeRunner};

use submux_core::app::App;
use submux_core::chat::{ButtonAction, FileRef, InboundEvent, MsgRef};
use submux_core::config::Config;
use submux_core::feed::MemoryDedup;
use submux_core::router::Router;
use submux_core::token;

const OWNER: i64 = 7;
const MAIN_CHANNEL: i64 = -100123;
const DB_CHANNEL: i64 = -200300;

const ASS_DOC: &str = "[Script Info]\nTitle: t\n\n[V4+ Styles]\nStyle: Default,Arial,16,&H00FFFFFF\n\n[Events]\nDialogue: 0,0:00:01.00,0:00:03.00,Default,,0,0,0,,Hello\n";

fn test_config(workdir: PathBuf) -> Config {
    Config {
        bot_token: "test-token".into(),
        bot_username: "submux_bot".into(),
        owner_ids: vec![OWNER],
        main_channel: Some(MAIN_CHANNEL),
        db_channel: DB_CHANNEL,
        aria2_host: "http://localhost".into(),
        aria2_port: 6800,
        aria2_secret: None,
        thumbnail: workdir.join("no-thumb.jpg"),
        font: workdir.join("no-font.otf"),
        font_name: "Oath-Bold".into(),
        sticker_id: None,
        track_title: "submux".into(),
        workdir,
        port: None,
        log_file: None,
        rss_url: None,
        feed_interval: Duration::from_secs(60),
        feed_item_delay: Duration::from_secs(5),
        feed_channels: Vec::new(),
        mux_jobs: 1,
        mux_timeout: Duration::from_secs(60),
        upload_timeout: Duration::from_secs(60),
        idle_horizon: Duration::from_secs(1800),
        reap_interval: Duration::from_secs(60),
        still_timecode: "00:00:05".into(),
        short_synopsis: true,
    }
}

struct Harness {
    chat: Arc<FakeChat>,
    runner: Arc<FakeRunner>,
    app: Arc<App>,
    router: Router,
    workdir: PathBuf,
    _dir: tempfile::TempDir,
}

fn harness(runner: FakeRunner) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let workdir = dir.path().to_path_buf();
    let chat = Arc::new(FakeChat::new());
    let runner = Arc::new(runner);
    let app = App::new(
        Arc::new(test_config(workdir.clone())),
        chat.clone(),
        runner.clone(),
        None,
        Arc::new(MemoryDedup::new()),
    );
    let router = Router::new(Arc::clone(&app));
    Harness {
        chat,
        runner,
        app,
        router,
        workdir,
        _dir: dir,
    }
}

fn msg(chat: i64, id: i64) -> MsgRef {
    MsgRef { chat, id }
}

fn file(file_id: &str, name: &str, mime: &str) -> FileRef {
    FileRef {
        file_id: file_id.into(),
        file_name: Some(name.into()),
        mime_type: Some(mime.into()),
        size: None,
    }
}

fn video_event(file_id: &str) -> InboundEvent {
    InboundEvent::Video {
        from: OWNER,
        chat: OWNER,
        file: file(file_id, "clip.mp4", "video/mp4"),
        msg: msg(OWNER, 1),
    }
}

fn command(from: i64, name: &str, arg: Option<&str>) -> InboundEvent {
    InboundEvent::Command {
        from,
        chat: from,
        name: name.into(),
        arg: arg.map(str::to_string),
    }
}

async fn wait_for<F: FnMut() -> bool>(what: &str, mut check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn wait_store_empty(app: &Arc<App>) {
    for _ in 0..200 {
        if app.store.len().await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for the session store to drain");
}

/// Drive a manual-mode session through video, subtitle, name, and photo.
async fn drive_to_processing(h: &Harness) {
    h.app.toggle_mode(); // default is auto; these flows are manual
    h.chat.stage_file("vid1", &[1u8; 4096]);
    h.chat.stage_file("sub1", ASS_DOC.as_bytes());
    h.chat.stage_file("thumb1", &[2u8; 128]);

    h.router.handle(video_event("vid1")).await;
    h.router
        .handle(InboundEvent::Document {
            from: OWNER,
            chat: OWNER,
            file: file("sub1", "t.ass", "text/plain"),
            msg: msg(OWNER, 2),
        })
        .await;
    h.router
        .handle(InboundEvent::Text {
            from: OWNER,
            chat: OWNER,
            text: "Episode 1".into(),
        })
        .await;
    h.router
        .handle(InboundEvent::Photo {
            from: OWNER,
            chat: OWNER,
            file: file("thumb1", "photo.jpg", "image/jpeg"),
            msg: msg(OWNER, 3),
        })
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn merge_pipeline_happy_path() {
    let h = harness(FakeRunner::new());
    drive_to_processing(&h).await;

    wait_for("upload and session teardown", || {
        !h.chat.documents.lock().unwrap().is_empty()
    })
    .await;
    wait_for("store drained", || {
        h.chat
            .edit_texts()
            .iter()
            .any(|t| t.contains("✅ Process completed successfully"))
    })
    .await;

    // Artifact landed in the storage channel, named and captioned by the
    // operator's text input.
    let documents = h.chat.documents.lock().unwrap().clone();
    assert_eq!(documents.len(), 1);
    let doc = &documents[0];
    assert_eq!(doc.chat, DB_CHANNEL);
    assert_eq!(doc.file_name, "Episode 1.mkv");
    assert_eq!(doc.caption, "Episode 1");
    assert_eq!(doc.bytes, b"fake-container");

    // Two tool invocations: strip, then the mux with metadata and subtitle.
    let calls = h.runner.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].join(" ").contains("-map 0:v"));
    let mux = calls[1].join(" ");
    assert!(mux.contains("sub_7.ass"));
    assert!(mux.contains("-metadata:s:s:0 title=submux"));
    assert!(mux.contains("-disposition:s:s:0 default"));

    // The announcement post carries exactly one button whose URL decodes
    // back to the stored message.
    let posts = h.chat.texts_sent_to(MAIN_CHANNEL);
    let announcement = posts
        .iter()
        .find(|t| t.starts_with("☗   Episode 1"))
        .expect("announcement post");
    assert!(announcement.starts_with("☗   Episode 1"));

    let sent = h.chat.sent.lock().unwrap();
    let post_msg = sent
        .iter()
        .find(|m| m.chat == MAIN_CHANNEL && m.text.starts_with("☗"))
        .unwrap();
    let markup = post_msg.markup.as_ref().unwrap();
    let buttons: Vec<_> = markup.iter().flatten().collect();
    assert_eq!(buttons.len(), 1);
    let ButtonAction::Url(url) = &buttons[0].action else {
        panic!("expected url button");
    };
    let raw_token = url.rsplit("start=").next().unwrap();
    assert_eq!(token::decode(raw_token, DB_CHANNEL).unwrap(), doc.msg_id);
    drop(sent);

    // Public status surface deleted, private kept with the final line.
    assert!(h
        .chat
        .deleted
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.chat == MAIN_CHANNEL));

    // Terminal session: record gone, every temp path released.
    wait_store_empty(&h.app).await;
    wait_for("temp files released", || {
        std::fs::read_dir(&h.workdir)
            .map(|d| d.filter_map(|e| e.ok()).count() == 0)
            .unwrap_or(false)
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_byte_artifact_is_refused_before_upload() {
    let h = harness(FakeRunner::empty_output());
    drive_to_processing(&h).await;

    wait_for("failure surfaced", || {
        h.chat.edit_texts().iter().any(|t| t.starts_with("❌"))
    })
    .await;

    assert!(h.chat.documents.lock().unwrap().is_empty());
    wait_store_empty(&h.app).await;
    let failure = h
        .chat
        .edit_texts()
        .into_iter()
        .find(|t| t.starts_with("❌"))
        .unwrap();
    assert!(failure.contains("empty file"), "got: {failure}");
}

#[tokio::test(flavor = "multi_thread")]
async fn cleanup_cancels_inflight_mux_and_releases_everything() {
    let h = harness(FakeRunner::blocking());
    drive_to_processing(&h).await;

    // The strip invocation is underway and parked on the cancel token.
    wait_for("media tool invoked", || {
        !h.runner.calls.lock().unwrap().is_empty()
    })
    .await;

    h.router.handle(command(OWNER, "cleanup", None)).await;

    wait_for("session removed", || {
        h.chat
            .edit_texts()
            .iter()
            .any(|t| t.contains("Cancelled"))
    })
    .await;
    assert_eq!(h.app.store.len().await, 0);
    assert!(h.chat.documents.lock().unwrap().is_empty());
    assert!(h
        .chat
        .texts_sent_to(OWNER)
        .iter()
        .any(|t| t == "Storage has been cleared."));
    assert!(h
        .chat
        .deleted
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.chat == MAIN_CHANNEL));

    wait_for("temp files released", || {
        std::fs::read_dir(&h.workdir)
            .map(|d| d.filter_map(|e| e.ok()).count() == 0)
            .unwrap_or(false)
    })
    .await;

    // A second cleanup is a no-op that still acknowledges.
    h.router.handle(command(OWNER, "cleanup", None)).await;
    assert_eq!(
        h.chat
            .texts_sent_to(OWNER)
            .iter()
            .filter(|t| *t == "Storage has been cleared.")
            .count(),
        2
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn auto_mode_fails_session_when_video_has_no_subtitle_stream() {
    let h = harness(FakeRunner::failing());
    h.chat.stage_file("vid1", &[1u8; 4096]);

    // Default mode is auto: the video arrival triggers extraction, which
    // the failing runner rejects.
    h.router.handle(video_event("vid1")).await;

    wait_for("auto failure surfaced", || {
        h.chat.edit_texts().iter().any(|t| t.starts_with("❌"))
    })
    .await;
    wait_store_empty(&h.app).await;
    let failure = h
        .chat
        .edit_texts()
        .into_iter()
        .find(|t| t.starts_with("❌"))
        .unwrap();
    assert!(failure.contains("no subtitle stream"), "got: {failure}");
}

#[tokio::test]
async fn text_before_video_gets_a_stage_hint() {
    let h = harness(FakeRunner::new());
    h.router
        .handle(InboundEvent::Text {
            from: OWNER,
            chat: OWNER,
            text: "hello".into(),
        })
        .await;
    let texts = h.chat.texts_sent_to(OWNER);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("start by sending a video"));
}

#[tokio::test]
async fn non_owner_events_are_dropped_silently() {
    let h = harness(FakeRunner::new());
    h.router
        .handle(InboundEvent::Text {
            from: 999,
            chat: 999,
            text: "hello".into(),
        })
        .await;
    h.router.handle(command(999, "post", None)).await;
    assert!(h.chat.sent.lock().unwrap().is_empty());
    assert_eq!(h.app.store.len().await, 0);
}

#[tokio::test]
async fn share_token_redemption_is_open_to_everyone() {
    let h = harness(FakeRunner::new());
    let raw_token = token::mint(42, DB_CHANNEL);
    h.router
        .handle(command(999, "start", Some(&raw_token)))
        .await;

    let copied = h.chat.copied.lock().unwrap().clone();
    assert_eq!(copied.len(), 1);
    assert_eq!(copied[0].0, msg(DB_CHANNEL, 42));
    assert_eq!(copied[0].1, 999);
}

#[tokio::test]
async fn post_menu_validates_fields_and_requirements() {
    let h = harness(FakeRunner::new());
    h.router.handle(command(OWNER, "post", None)).await;

    let menu_sent = h.chat.sent.lock().unwrap().last().unwrap().clone();
    assert!(menu_sent.text.contains("Create New Post"));
    let menu = msg(OWNER, menu_sent.msg_id);

    // Required fields missing: create_post is refused via callback alert.
    h.router
        .handle(InboundEvent::Callback {
            from: OWNER,
            chat: OWNER,
            callback_id: "cb1".into(),
            data: format!("create_post_{OWNER}"),
            msg: menu.clone(),
        })
        .await;
    let answers = h.chat.answers.lock().unwrap().clone();
    let alert = answers.last().unwrap().as_deref().unwrap();
    assert!(alert.contains("title"));
    assert!(alert.contains("ddl_url"));

    // Fill the title via the menu, then reject a malformed rating.
    h.router
        .handle(InboundEvent::Callback {
            from: OWNER,
            chat: OWNER,
            callback_id: "cb2".into(),
            data: format!("set_title_{OWNER}"),
            msg: menu.clone(),
        })
        .await;
    h.router
        .handle(InboundEvent::Text {
            from: OWNER,
            chat: OWNER,
            text: "Battle".into(),
        })
        .await;
    assert!(h
        .chat
        .edit_texts()
        .iter()
        .any(|t| t.contains("☗   Battle")));

    h.router
        .handle(InboundEvent::Callback {
            from: OWNER,
            chat: OWNER,
            callback_id: "cb3".into(),
            data: format!("set_rating_{OWNER}"),
            msg: menu.clone(),
        })
        .await;
    h.router
        .handle(InboundEvent::Text {
            from: OWNER,
            chat: OWNER,
            text: "9.5".into(),
        })
        .await;
    assert!(h
        .chat
        .texts_sent_to(OWNER)
        .iter()
        .any(|t| t.contains("rating")));
}

#[tokio::test]
async fn cancel_button_tears_down_the_menu_session() {
    let h = harness(FakeRunner::new());
    h.router.handle(command(OWNER, "post", None)).await;
    let menu_id = h.chat.sent.lock().unwrap().last().unwrap().msg_id;

    h.router
        .handle(InboundEvent::Callback {
            from: OWNER,
            chat: OWNER,
            callback_id: "cb".into(),
            data: format!("cancel_{OWNER}"),
            msg: msg(OWNER, menu_id),
        })
        .await;

    assert_eq!(h.app.store.len().await, 0);
    assert!(h
        .chat
        .edit_texts()
        .iter()
        .any(|t| t.contains("cancelled")));
}
