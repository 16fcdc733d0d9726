use std::sync::{Arc, Mutex};

use super::*;
use crate::{
    codec::command::{BBox, Command},
    codec::encode::encode,
    model::text_data::{Block, Content, Paragraph},
};

#[derive(Clone, Default)]
struct Log {
    loads: Arc<Mutex<Vec<String>>>,
    execs: Arc<Mutex<Vec<String>>>,
}

struct Scripted {
    log: Log,
}

impl LayoutEngine for Scripted {
    fn load_font_buffer(&mut self, family: &str, bytes: &[u8]) -> anyhow::Result<()> {
        anyhow::ensure!(bytes == family.as_bytes(), "corrupt font bytes for {family}");
        self.log.loads.lock().unwrap().push(family.to_string());
        Ok(())
    }

    fn exec(&mut self, job_json: &str) -> anyhow::Result<Vec<f32>> {
        self.log.execs.lock().unwrap().push(job_json.to_string());
        anyhow::ensure!(!job_json.contains("explode"), "bad input");
        Ok(encode(
            &[BBox::new(0.0, 0.0, 10.0, 10.0)],
            &[Command::Fill(crate::codec::color::HexColor::new(1, 2, 3))],
        ))
    }
}

fn text_data(text: &str, families: &[&str]) -> TextData {
    let blocks = families
        .iter()
        .map(|family| Block {
            text: text.to_string(),
            font_family: family.to_string(),
            font_size: 12.0,
            letter_spacing: 0.0,
            fill: "#000000".to_string(),
            italic: false,
            stroke: "#000000".to_string(),
            stroke_width: 0.0,
            decoration: Default::default(),
        })
        .collect();
    TextData {
        width: 100.0,
        height: 50.0,
        paragraph: Paragraph {
            text_align: Default::default(),
            resizing: Default::default(),
            align: Default::default(),
            paragraph_spacing: 0.0,
            writing_mode: Default::default(),
            shadow: None,
            advanced_data: Default::default(),
            contents: vec![Content {
                line_height: 1.0,
                paragraph_indentation: 0.0,
                blocks,
            }],
        },
    }
}

fn job(job_id: u64, text: &str, families: &[&str]) -> Envelope {
    Envelope::TextData(JobContent {
        job_id,
        text_data: text_data(text, families),
    })
}

fn deliver(family: &str) -> Envelope {
    Envelope::FontCache(FontCache::fulfilled(family, family.as_bytes().to_vec()))
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Envelope {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("worker answered in time")
        .expect("worker alive")
}

fn start(opts: &DispatcherOpts) -> (WorkerChannels, Log) {
    let log = Log::default();
    let engine_log = log.clone();
    let channels = spawn_worker(move || Ok(Scripted { log: engine_log }), opts).unwrap();
    (channels, log)
}

async fn start_ready(opts: &DispatcherOpts) -> (WorkerChannels, Log) {
    let (mut w, log) = start(opts);
    assert_eq!(
        recv(&mut w.from_worker).await,
        Envelope::RequestCache(FontFamily {
            font_family: "default".to_string()
        })
    );
    w.to_worker.send(deliver("default")).unwrap();
    assert_eq!(recv(&mut w.from_worker).await, Envelope::Loaded);
    (w, log)
}

fn requested(env: &Envelope) -> &str {
    match env {
        Envelope::RequestCache(f) => &f.font_family,
        other => panic!("expected requestCache, got {other:?}"),
    }
}

#[tokio::test]
async fn repeated_families_are_requested_once() {
    let (mut w, log) = start_ready(&DispatcherOpts::default()).await;

    w.to_worker.send(job(1, "hi", &["A", "B", "A"])).unwrap();
    let first = recv(&mut w.from_worker).await;
    let second = recv(&mut w.from_worker).await;
    assert_eq!(requested(&first), "A");
    assert_eq!(requested(&second), "B");

    w.to_worker.send(deliver("B")).unwrap();
    w.to_worker.send(deliver("A")).unwrap();
    match recv(&mut w.from_worker).await {
        Envelope::RenderOk(ok) => {
            assert_eq!(ok.job_id, 1);
            assert_eq!(ok.result.boxes.len(), 1);
        }
        other => panic!("expected ok, got {other:?}"),
    }
    assert_eq!(
        *log.loads.lock().unwrap(),
        vec!["default".to_string(), "A".to_string(), "B".to_string()]
    );

    // loaded families skip the relay entirely
    w.to_worker.send(job(2, "again", &["B", "default"])).unwrap();
    assert!(matches!(recv(&mut w.from_worker).await, Envelope::RenderOk(ok) if ok.job_id == 2));
    assert_eq!(log.execs.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn exec_failure_is_reported_and_worker_stays_usable() {
    let (mut w, _log) = start_ready(&DispatcherOpts::default()).await;

    w.to_worker.send(job(1, "explode", &["default"])).unwrap();
    match recv(&mut w.from_worker).await {
        Envelope::RenderErr(err) => {
            assert_eq!(err.job_id, 1);
            assert!(err.message.contains("bad input"));
            let echoed: TextData = serde_json::from_str(&err.text_data).unwrap();
            assert_eq!(echoed, text_data("explode", &["default"]));
        }
        other => panic!("expected err, got {other:?}"),
    }

    w.to_worker.send(job(2, "fine", &["default"])).unwrap();
    assert!(matches!(recv(&mut w.from_worker).await, Envelope::RenderOk(ok) if ok.job_id == 2));
}

#[tokio::test]
async fn engine_sees_normalized_jobs() {
    let (mut w, log) = start_ready(&DispatcherOpts::default()).await;
    let mut data = text_data("shadowed", &["default"]);
    data.paragraph.shadow = Some(crate::model::text_data::Shadow {
        blur: 3.0,
        offset: [1.0, 1.0],
        color: "#ff0000".to_string(),
    });
    w.to_worker
        .send(Envelope::TextData(JobContent {
            job_id: 9,
            text_data: data,
        }))
        .unwrap();
    assert!(matches!(recv(&mut w.from_worker).await, Envelope::RenderOk(_)));
    let seen: TextData = serde_json::from_str(&log.execs.lock().unwrap()[0]).unwrap();
    assert_eq!(seen.paragraph.shadow, None);
}

#[tokio::test]
async fn jobs_before_ready_wait_for_initialization() {
    let (mut w, log) = start(&DispatcherOpts::default());
    assert_eq!(requested(&recv(&mut w.from_worker).await), "default");

    w.to_worker.send(job(1, "early", &["default"])).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(log.execs.lock().unwrap().is_empty());

    w.to_worker.send(deliver("default")).unwrap();
    assert_eq!(recv(&mut w.from_worker).await, Envelope::Loaded);
    assert!(matches!(recv(&mut w.from_worker).await, Envelope::RenderOk(ok) if ok.job_id == 1));
}

#[tokio::test]
async fn preload_of_loaded_family_answers_immediately() {
    let (mut w, _log) = start_ready(&DispatcherOpts::default()).await;
    w.to_worker
        .send(Envelope::Preload(FontFamily {
            font_family: "default".to_string(),
        }))
        .unwrap();
    assert_eq!(
        recv(&mut w.from_worker).await,
        Envelope::LoadedFont(LoadedFont {
            font_family: "default".to_string(),
            error: None
        })
    );
}

#[tokio::test]
async fn preload_goes_through_the_relay() {
    let (mut w, log) = start_ready(&DispatcherOpts::default()).await;
    w.to_worker
        .send(Envelope::Preload(FontFamily {
            font_family: "Serif".to_string(),
        }))
        .unwrap();
    assert_eq!(requested(&recv(&mut w.from_worker).await), "Serif");
    w.to_worker.send(deliver("Serif")).unwrap();
    assert_eq!(
        recv(&mut w.from_worker).await,
        Envelope::LoadedFont(LoadedFont {
            font_family: "Serif".to_string(),
            error: None
        })
    );
    assert!(log.loads.lock().unwrap().contains(&"Serif".to_string()));
}

#[tokio::test]
async fn relay_failure_rejects_the_job() {
    let (mut w, _log) = start_ready(&DispatcherOpts::default()).await;
    w.to_worker.send(job(3, "x", &["Missing"])).unwrap();
    assert_eq!(requested(&recv(&mut w.from_worker).await), "Missing");
    w.to_worker
        .send(Envelope::FontCache(FontCache::failed("Missing", "not found")))
        .unwrap();
    match recv(&mut w.from_worker).await {
        Envelope::RenderErr(err) => {
            assert_eq!(err.job_id, 3);
            assert!(err.message.starts_with("relay error:"));
            assert!(err.message.contains("not found"));
        }
        other => panic!("expected err, got {other:?}"),
    }
}

#[tokio::test]
async fn relay_timeout_rejects_and_allows_a_fresh_request() {
    let opts = DispatcherOpts {
        relay_timeout_ms: Some(30),
        ..DispatcherOpts::default()
    };
    let (mut w, _log) = start_ready(&opts).await;
    w.to_worker.send(job(1, "x", &["Slow"])).unwrap();
    assert_eq!(requested(&recv(&mut w.from_worker).await), "Slow");
    match recv(&mut w.from_worker).await {
        Envelope::RenderErr(err) => assert!(err.message.starts_with("timeout:")),
        other => panic!("expected err, got {other:?}"),
    }

    // the late answer is dropped, and the next job asks again
    w.to_worker.send(deliver("Slow")).unwrap();
    w.to_worker.send(job(2, "x", &["Slow"])).unwrap();
    assert_eq!(requested(&recv(&mut w.from_worker).await), "Slow");
}

#[tokio::test]
async fn failed_engine_construction_is_terminal() {
    let channels = spawn_worker::<Scripted, _>(
        || Err(anyhow::anyhow!("no wasm today")),
        &DispatcherOpts::default(),
    );
    let mut w = channels.unwrap();
    match recv(&mut w.from_worker).await {
        Envelope::LoadErr(err) => assert!(err.message.contains("no wasm today")),
        other => panic!("expected loadErr, got {other:?}"),
    }
    assert_eq!(*w.state.borrow(), WorkerState::InitFailed);

    w.to_worker.send(job(1, "x", &["default"])).unwrap();
    assert!(matches!(recv(&mut w.from_worker).await, Envelope::RenderErr(e) if e.message.starts_with("init error:")));

    w.to_worker
        .send(Envelope::Preload(FontFamily {
            font_family: "A".to_string(),
        }))
        .unwrap();
    assert!(matches!(recv(&mut w.from_worker).await, Envelope::LoadedFont(f) if f.error.is_some()));
}

#[tokio::test]
async fn default_font_failure_reports_load_err() {
    let (mut w, _log) = start(&DispatcherOpts::default());
    assert_eq!(requested(&recv(&mut w.from_worker).await), "default");
    w.to_worker
        .send(Envelope::FontCache(FontCache::failed("default", "gone")))
        .unwrap();
    match recv(&mut w.from_worker).await {
        Envelope::LoadErr(err) => assert!(err.message.contains("gone")),
        other => panic!("expected loadErr, got {other:?}"),
    }
}

#[tokio::test]
async fn worker_exits_when_controller_hangs_up() {
    let (w, _log) = start_ready(&DispatcherOpts::default()).await;
    let WorkerChannels {
        to_worker, thread, ..
    } = w;
    drop(to_worker);
    tokio::task::spawn_blocking(move || thread.join().unwrap())
        .await
        .unwrap();
}

/// Engine whose `exec` blocks until the test lets it go.
struct Gated {
    entered: std::sync::mpsc::Sender<()>,
    release: std::sync::mpsc::Receiver<()>,
}

impl LayoutEngine for Gated {
    fn load_font_buffer(&mut self, _family: &str, _bytes: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }

    fn exec(&mut self, _job_json: &str) -> anyhow::Result<Vec<f32>> {
        self.entered.send(())?;
        self.release.recv()?;
        Ok(encode(&[BBox::new(0.0, 0.0, 1.0, 1.0)], &[]))
    }
}

#[tokio::test]
async fn state_is_busy_only_while_a_job_executes() {
    let (entered_tx, entered_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel();
    let mut w = spawn_worker(
        move || {
            Ok(Gated {
                entered: entered_tx,
                release: release_rx,
            })
        },
        &DispatcherOpts::default(),
    )
    .unwrap();

    assert_eq!(requested(&recv(&mut w.from_worker).await), "default");
    assert_eq!(*w.state.borrow(), WorkerState::Initializing);
    w.to_worker.send(deliver("default")).unwrap();
    assert_eq!(recv(&mut w.from_worker).await, Envelope::Loaded);
    assert_eq!(*w.state.borrow(), WorkerState::Ready);

    w.to_worker.send(job(1, "hi", &["default"])).unwrap();
    tokio::task::spawn_blocking(move || entered_rx.recv().unwrap())
        .await
        .unwrap();
    assert_eq!(*w.state.borrow(), WorkerState::Busy);

    release_tx.send(()).unwrap();
    assert!(matches!(recv(&mut w.from_worker).await, Envelope::RenderOk(ok) if ok.job_id == 1));
    assert_eq!(*w.state.borrow(), WorkerState::Ready);
}
