//! End-to-end behaviour of `CoreState` without any output module.
//!
//! The "module" here is the test itself: it takes each `Dispatch` and feeds
//! back the worker events a real module would report.

use sayd_core::{
    ClientId, ControlRequest, CoreState, Dispatch, MessageKind, Notification, NotificationKind,
    NotificationMask, PauseTarget, Priority, Target, VoiceSettings, WorkerEvent,
};
use tokio::sync::mpsc;

const MODULE: &str = "espeak";

fn resolve(requested: Option<&str>) -> String {
    requested.unwrap_or(MODULE).to_string()
}

struct Client {
    uid: ClientId,
    events: mpsc::UnboundedReceiver<Notification>,
}

impl Client {
    fn connect(state: &mut CoreState, priority: Priority) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let uid = state.connect(tx);
        let session = state.session_mut(uid).unwrap();
        session.settings.priority = priority;
        session.settings.notification = NotificationMask::all();
        Self { uid, events }
    }

    fn kinds(&mut self) -> Vec<NotificationKind> {
        let mut kinds = Vec::new();
        while let Ok(n) = self.events.try_recv() {
            kinds.push(n.kind);
        }
        kinds
    }
}

/// Speak everything queued to completion, returning the spoken texts.
fn speak_all(state: &mut CoreState) -> Vec<String> {
    let mut spoken = Vec::new();
    while let Some(dispatch) = state.next_dispatch(resolve) {
        match dispatch {
            Dispatch::Speak { request, .. } => {
                spoken.push(request.text);
                state.on_worker_event(MODULE, WorkerEvent::Begin);
                state.on_worker_event(MODULE, WorkerEvent::End);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    spoken
}

#[test]
fn dequeue_order_is_urgency_then_age() {
    let mut state = CoreState::new(VoiceSettings::default());
    let mut clients: Vec<_> = [
        Priority::Text,
        Priority::Message,
        Priority::Important,
        Priority::Message,
    ]
    .into_iter()
    .map(|p| Client::connect(&mut state, p))
    .collect();

    for (index, client) in clients.iter().enumerate() {
        state
            .enqueue(client.uid, MessageKind::Key, &format!("key{index}"))
            .unwrap();
    }

    // Message arrivals dropped the queued Text message.
    assert_eq!(speak_all(&mut state), vec!["key2", "key1", "key3"]);
    assert_eq!(clients[0].kinds(), vec![NotificationKind::Cancel]);
    assert_eq!(
        clients[2].kinds(),
        vec![NotificationKind::Begin, NotificationKind::End]
    );
}

#[test]
fn three_progress_reports_only_speak_the_last() {
    let mut state = CoreState::new(VoiceSettings::default());
    let mut a = Client::connect(&mut state, Priority::Progress);

    for percent in [10, 50, 90] {
        state
            .enqueue(a.uid, MessageKind::Text, &format!("{percent} percent"))
            .unwrap();
    }

    let spoken = speak_all(&mut state);
    assert_eq!(spoken.len(), 1);
    assert!(spoken[0].contains("90 percent"));
    assert_eq!(
        a.kinds(),
        vec![
            NotificationKind::Cancel,
            NotificationKind::Cancel,
            NotificationKind::Begin,
            NotificationKind::End
        ]
    );
}

#[test]
fn stop_self_only_touches_own_utterance() {
    let mut state = CoreState::new(VoiceSettings::default());
    let a = Client::connect(&mut state, Priority::Text);
    let b = Client::connect(&mut state, Priority::Text);

    state.enqueue(a.uid, MessageKind::Text, "hello").unwrap();
    state.next_dispatch(resolve);

    assert!(!state.stop(Target::Caller, b.uid));
    assert_eq!(state.next_dispatch(resolve), None);
    assert!(state.stop(Target::Client(a.uid), b.uid));
    assert!(matches!(
        state.next_dispatch(resolve),
        Some(Dispatch::Stop { .. })
    ));
}

#[test]
fn pause_all_then_resume_all_restores_everything() {
    let mut state = CoreState::new(VoiceSettings::default());
    let a = Client::connect(&mut state, Priority::Important);
    let b = Client::connect(&mut state, Priority::Important);

    state.enqueue(a.uid, MessageKind::Text, "from a").unwrap();
    state.enqueue(b.uid, MessageKind::Text, "from b").unwrap();
    state.request_control(ControlRequest::Pause(PauseTarget::All));
    assert_eq!(state.next_dispatch(resolve), None);
    assert_eq!(state.paused.len(), 2);

    state.request_control(ControlRequest::Resume(PauseTarget::All));
    let spoken = speak_all(&mut state);
    assert_eq!(spoken.len(), 2);
    assert!(spoken[0].contains("from a"));
    assert!(spoken[1].contains("from b"));
    assert!(state.paused.is_empty());
}

#[test]
fn settings_snapshot_is_taken_at_enqueue_time() {
    let mut state = CoreState::new(VoiceSettings::default());
    let a = Client::connect(&mut state, Priority::Text);
    state.enqueue(a.uid, MessageKind::Text, "hello").unwrap();

    state
        .update_sessions(Target::Caller, a.uid, |s| {
            s.settings.rate = 80;
            Ok(())
        })
        .unwrap();

    let Some(Dispatch::Speak { request, .. }) = state.next_dispatch(resolve) else {
        panic!("expected a speak dispatch");
    };
    assert_eq!(request.settings.rate, 0);
    assert_eq!(state.session(a.uid).unwrap().settings.rate, 80);
}

#[test]
fn requested_output_module_is_honoured() {
    let mut state = CoreState::new(VoiceSettings::default());
    let a = Client::connect(&mut state, Priority::Text);
    state.session_mut(a.uid).unwrap().settings.output_module = Some("flite".into());
    state.enqueue(a.uid, MessageKind::SoundIcon, "bell").unwrap();

    let Some(Dispatch::Speak { module, request }) = state.next_dispatch(resolve) else {
        panic!("expected a speak dispatch");
    };
    assert_eq!(module, "flite");
    // Only text is marked.
    assert_eq!(request.text, "bell");
}
