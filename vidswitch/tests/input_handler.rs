use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vidswitch::testing::{ScriptedTransport, SourceScript};
use vidswitch::{
    BackoffPolicy, InputConfig, InputError, InputHandler, MediaKind, ReadError, SourceConfig,
    SourceKind, Transport, TransportError, WorkerPhase,
};

const READY_BUDGET: Duration = Duration::from_millis(200);
const WAIT: Duration = Duration::from_secs(2);

fn config() -> InputConfig {
    InputConfig::new(
        SourceConfig::stream("main"),
        SourceConfig::stream("backup"),
        SourceConfig::file("filler.mp4"),
    )
    .with_backoff(BackoffPolicy::fixed(Duration::from_millis(10)))
    .with_stop_timeout(Duration::from_secs(1))
}

fn healthy_transport() -> Arc<ScriptedTransport> {
    Arc::new(
        ScriptedTransport::new()
            .with_source("main", SourceScript::video_and_audio())
            .with_source("backup", SourceScript::video_and_audio())
            .with_source("filler.mp4", SourceScript::video_and_audio()),
    )
}

fn handler(transport: &Arc<ScriptedTransport>) -> InputHandler {
    InputHandler::new(config(), Arc::clone(transport) as Arc<dyn Transport>)
}

fn wait_all_ready(handler: &InputHandler, timeout: Duration) -> bool {
    SourceKind::ALL
        .iter()
        .all(|kind| handler.wait_until_ready(*kind, timeout))
}

#[test]
fn construction_does_no_io() {
    let transport = healthy_transport();
    let handler = handler(&transport);

    assert_eq!(handler.get_current_input(), SourceKind::Filler);
    assert_eq!(handler.get_input_format_context().map(|c| c.kind()), None);
    assert_eq!(handler.input_demux(), None);
    for location in ["main", "backup", "filler.mp4"] {
        assert_eq!(transport.attempt_count(location), 0);
    }
    for kind in SourceKind::ALL {
        assert_eq!(handler.source_state(kind).phase(), WorkerPhase::Idle);
    }
}

#[test]
fn all_sources_become_ready() {
    let transport = healthy_transport();
    let handler = handler(&transport);

    assert_eq!(handler.open_input().unwrap(), 3);
    assert!(wait_all_ready(&handler, READY_BUDGET));

    let context = handler.input_switch(SourceKind::Main).expect("main context");
    assert_eq!(context.kind(), SourceKind::Main);
    assert_eq!(context.location(), "main");

    let video = handler.input_demux().expect("video stream");
    assert_eq!(video.index, 0);
    assert_eq!(video.kind, MediaKind::Video);
}

#[test]
fn failing_main_never_becomes_ready() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source("main", SourceScript::failing_open(-111))
            .with_source("backup", SourceScript::video_and_audio())
            .with_source("filler.mp4", SourceScript::video_and_audio()),
    );
    let handler = handler(&transport);
    handler.open_input().unwrap();

    assert!(handler.wait_until_ready(SourceKind::Backup, WAIT));
    assert!(handler.wait_until_ready(SourceKind::Filler, WAIT));
    assert!(!handler.wait_until_ready(SourceKind::Main, Duration::from_millis(150)));

    let main = handler.source_state(SourceKind::Main);
    assert!(main.consecutive_failures() >= 1);
    assert_eq!(main.last_error().map(|e| e.code()), Some(-111));

    assert!(handler.input_switch(SourceKind::Main).is_none());
    assert_eq!(handler.get_current_input(), SourceKind::Main);
    assert!(handler.get_input_format_context().is_none());
    assert_eq!(handler.input_demux(), None);
    assert_eq!(
        handler.try_input_demux(),
        Err(InputError::NoContextAvailable(SourceKind::Main))
    );
    assert_eq!(
        handler.read_packet().unwrap_err(),
        InputError::NoContextAvailable(SourceKind::Main)
    );

    // Recovery makes the already-selected source usable without another switch
    transport.set_open_failure("main", None);
    assert!(handler.wait_until_ready(SourceKind::Main, WAIT));
    assert_eq!(
        handler.get_input_format_context().map(|c| c.kind()),
        Some(SourceKind::Main)
    );
    assert_eq!(handler.input_demux().map(|s| s.index), Some(0));
}

#[test]
fn last_switch_wins() {
    let transport = healthy_transport();
    let handler = handler(&transport);

    let sequence = [
        SourceKind::Main,
        SourceKind::Backup,
        SourceKind::Backup,
        SourceKind::Filler,
        SourceKind::Main,
    ];
    for kind in sequence {
        handler.input_switch(kind);
        assert_eq!(handler.get_current_input(), kind);
    }
}

#[test]
fn concurrent_switches_never_tear() {
    let transport = healthy_transport();
    let handler = Arc::new(handler(&transport));
    handler.open_input().unwrap();

    let switchers: Vec<_> = [SourceKind::Main, SourceKind::Backup]
        .into_iter()
        .map(|kind| {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                for _ in 0..2000 {
                    handler.input_switch(kind);
                }
            })
        })
        .collect();

    let reader = {
        let handler = Arc::clone(&handler);
        thread::spawn(move || {
            for _ in 0..2000 {
                let current = handler.get_current_input();
                assert!(SourceKind::ALL.contains(&current));
                if let Some(context) = handler.get_input_format_context() {
                    assert!(SourceKind::ALL.contains(&context.kind()));
                }
            }
        })
    };

    for switcher in switchers {
        switcher.join().unwrap();
    }
    reader.join().unwrap();

    let current = handler.get_current_input();
    assert!(matches!(current, SourceKind::Main | SourceKind::Backup));
}

#[test]
fn demux_picks_first_video_by_index() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source(
                "main",
                SourceScript::with_streams(&[
                    MediaKind::Audio,
                    MediaKind::Video,
                    MediaKind::Video,
                ]),
            )
            .with_source("backup", SourceScript::video_and_audio())
            .with_source("filler.mp4", SourceScript::video_and_audio()),
    );
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(handler.wait_until_ready(SourceKind::Main, WAIT));

    handler.input_switch(SourceKind::Main);
    assert_eq!(handler.input_demux().map(|s| s.index), Some(1));
}

#[test]
fn demux_without_video_is_absent() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source("main", SourceScript::audio_only())
            .with_source("backup", SourceScript::no_streams())
            .with_source("filler.mp4", SourceScript::video_and_audio()),
    );
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(wait_all_ready(&handler, WAIT));

    assert!(handler.input_switch(SourceKind::Main).is_some());
    assert_eq!(handler.input_demux(), None);
    assert_eq!(
        handler.try_input_demux(),
        Err(InputError::NoStreamFound(SourceKind::Main))
    );

    let backup = handler.input_switch(SourceKind::Backup).expect("backup context");
    assert!(backup.streams().is_empty());
    assert_eq!(handler.input_demux(), None);
}

#[test]
fn demux_does_not_change_selection() {
    let transport = healthy_transport();
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(wait_all_ready(&handler, WAIT));

    handler.input_switch(SourceKind::Backup);
    for _ in 0..10 {
        assert!(handler.input_demux().is_some());
        assert_eq!(handler.get_current_input(), SourceKind::Backup);
    }
}

#[test]
fn open_input_is_idempotent() {
    let transport = healthy_transport();
    let handler = handler(&transport);

    assert_eq!(handler.open_input().unwrap(), 3);
    assert_eq!(handler.open_input().unwrap(), 0);
    assert!(wait_all_ready(&handler, WAIT));
    assert_eq!(handler.open_input().unwrap(), 0);

    for location in ["main", "backup", "filler.mp4"] {
        assert_eq!(transport.open_count(location), 1);
    }
}

#[test]
fn shutdown_closes_every_context_once() {
    let transport = healthy_transport();
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(wait_all_ready(&handler, WAIT));
    let view = handler.input_switch(SourceKind::Main).unwrap();

    assert!(handler.shutdown());

    assert!(!view.is_open());
    assert_eq!(view.read_packet(), Err(ReadError::Closed));
    assert!(handler.get_input_format_context().is_none());
    for kind in SourceKind::ALL {
        assert_eq!(handler.source_state(kind).phase(), WorkerPhase::Terminated);
    }
    for location in ["main", "backup", "filler.mp4"] {
        assert_eq!(transport.close_count(location), 1);
    }
    assert_eq!(handler.get_current_input(), SourceKind::Main);
}

#[test]
fn open_after_shutdown_restarts() {
    let transport = healthy_transport();
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(wait_all_ready(&handler, WAIT));
    handler.shutdown();

    assert_eq!(handler.open_input().unwrap(), 3);
    assert!(wait_all_ready(&handler, WAIT));
    for location in ["main", "backup", "filler.mp4"] {
        assert_eq!(transport.open_count(location), 2);
        assert_eq!(transport.close_count(location), 1);
    }
}

#[test]
fn drop_stops_workers_and_closes_contexts() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source("main", SourceScript::failing_open(-111))
            .with_source("backup", SourceScript::video_and_audio())
            .with_source("filler.mp4", SourceScript::video_and_audio()),
    );
    {
        let handler = handler(&transport);
        handler.open_input().unwrap();
        assert!(handler.wait_until_ready(SourceKind::Backup, WAIT));
        assert!(handler.wait_until_ready(SourceKind::Filler, WAIT));
    }

    for location in ["main", "backup", "filler.mp4"] {
        assert_eq!(transport.open_count(location), transport.close_count(location));
    }
    let attempts = transport.attempt_count("main");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(transport.attempt_count("main"), attempts);
}

#[test]
fn filler_loops_at_end_of_stream() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source("main", SourceScript::video_and_audio())
            .with_source("backup", SourceScript::video_and_audio())
            .with_source(
                "filler.mp4",
                SourceScript::video_and_audio().with_packet_limit(3),
            ),
    );
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(handler.wait_until_ready(SourceKind::Filler, WAIT));
    let first = handler.get_input_format_context().unwrap();

    for _ in 0..3 {
        assert!(handler.read_packet().is_ok());
    }
    assert_eq!(
        handler.read_packet(),
        Err(InputError::Read {
            kind: SourceKind::Filler,
            source: ReadError::EndOfStream
        })
    );

    assert!(wait_for(|| transport.open_count("filler.mp4") == 2));
    assert!(handler.wait_until_ready(SourceKind::Filler, WAIT));

    let second = handler.get_input_format_context().unwrap();
    assert!(!second.same_context(&first));
    assert!(second.generation() > first.generation());
    assert!(handler.read_packet().is_ok());
    assert_eq!(first.read_packet(), Err(ReadError::Closed));
    assert_eq!(handler.get_current_input(), SourceKind::Filler);
}

#[test]
fn fatal_read_reopens_only_that_source() {
    let reset = ReadError::Fatal(TransportError::new(-104, "Connection reset by peer"));
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source(
                "main",
                SourceScript::video_and_audio()
                    .with_packet_limit(1)
                    .ending_with(reset.clone()),
            )
            .with_source("backup", SourceScript::video_and_audio())
            .with_source("filler.mp4", SourceScript::video_and_audio()),
    );
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(wait_all_ready(&handler, WAIT));

    handler.input_switch(SourceKind::Main);
    assert!(handler.read_packet().is_ok());
    let err = handler.read_packet().unwrap_err();
    assert_eq!(
        err,
        InputError::Read {
            kind: SourceKind::Main,
            source: reset
        }
    );
    assert_eq!(err.kind(), SourceKind::Main);

    // The consumer falls back while main reconnects
    assert!(handler.input_switch(SourceKind::Backup).is_some());
    assert!(handler.read_packet().is_ok());

    assert!(wait_for(|| transport.open_count("main") == 2));
    assert!(handler.wait_until_ready(SourceKind::Main, WAIT));
    assert_eq!(transport.open_count("backup"), 1);
    assert_eq!(transport.open_count("filler.mp4"), 1);
}

#[test]
fn source_ending_at_once_is_not_reopened_per_read() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source("main", SourceScript::video_and_audio().with_packet_limit(0))
            .with_source("backup", SourceScript::video_and_audio())
            .with_source("filler.mp4", SourceScript::video_and_audio()),
    );
    let handler = InputHandler::new(
        config().with_backoff(BackoffPolicy::fixed(Duration::from_millis(500))),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    handler.open_input().unwrap();
    assert!(handler.wait_until_ready(SourceKind::Main, WAIT));
    handler.input_switch(SourceKind::Main);

    for _ in 0..250 {
        assert!(handler.read_packet().is_err());
        thread::sleep(Duration::from_millis(2));
    }

    assert!(transport.open_count("main") <= 2);
    assert_eq!(handler.get_current_input(), SourceKind::Main);
}

#[test]
fn large_stream_table_picks_leading_video() {
    let mut kinds = vec![MediaKind::Video; 10];
    kinds.extend([MediaKind::Audio; 10]);
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source("main", SourceScript::with_streams(&kinds))
            .with_source("backup", SourceScript::video_and_audio())
            .with_source("filler.mp4", SourceScript::video_and_audio()),
    );
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(handler.wait_until_ready(SourceKind::Main, WAIT));

    let context = handler.input_switch(SourceKind::Main).expect("main context");
    assert_eq!(context.streams().len(), 20);
    let video = handler.input_demux().expect("video stream");
    assert_eq!(video.index, 0);
    assert_eq!(video.kind, MediaKind::Video);
}

#[test]
fn transient_read_error_keeps_context() {
    let hiccup = ReadError::Transient(TransportError::new(-11, "Resource temporarily unavailable"));
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_source("main", SourceScript::video_and_audio())
            .with_source("backup", SourceScript::video_and_audio())
            .with_source(
                "filler.mp4",
                SourceScript::video_and_audio()
                    .with_packet_limit(0)
                    .ending_with(hiccup.clone()),
            ),
    );
    let handler = handler(&transport);
    handler.open_input().unwrap();
    assert!(handler.wait_until_ready(SourceKind::Filler, WAIT));

    for _ in 0..3 {
        assert_eq!(
            handler.read_packet(),
            Err(InputError::Read {
                kind: SourceKind::Filler,
                source: hiccup.clone()
            })
        );
    }
    thread::sleep(Duration::from_millis(50));
    assert_eq!(transport.open_count("filler.mp4"), 1);
    assert_eq!(handler.source_state(SourceKind::Filler).generation(), 1);
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}
