//! Lifecycle tests for the wire-harp coordinator.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use wirescan_daq::gateway::mock::MockGateway;
use wirescan_daq::{DeviceRef, FieldDescriptor, HarpControllerListener, HarpCoordinator, Settings};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Initiated(Vec<String>, u32),
    Sampled(String, u32),
    Completed(Vec<String>),
    Aborted,
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl HarpControllerListener for Recorder {
    fn daq_initiated(&self, devices: &[DeviceRef], sample_count: u32) {
        let names = devices.iter().map(|d| d.id().to_string()).collect();
        self.push(Event::Initiated(names, sample_count));
    }

    fn device_sampled(&self, device: &DeviceRef, samples_taken: u32) {
        self.push(Event::Sampled(device.id().to_string(), samples_taken));
    }

    fn daq_completed(&self, devices: &[DeviceRef]) {
        let names = devices.iter().map(|d| d.id().to_string()).collect();
        self.push(Event::Completed(names));
    }

    fn daq_aborted(&self) {
        self.push(Event::Aborted);
    }
}

fn rig(settings: &Settings) -> (Arc<MockGateway>, HarpCoordinator, Arc<Recorder>) {
    let gateway = Arc::new(MockGateway::new());
    let coordinator = HarpCoordinator::new(gateway.clone(), settings);
    let recorder = Arc::new(Recorder::default());
    coordinator.register_listener(recorder.clone());
    (gateway, coordinator, recorder)
}

async fn wait_until(cond: impl Fn() -> bool) -> bool {
    for _ in 0..500 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    false
}

#[tokio::test]
async fn samples_count_toward_target_and_complete_the_session() {
    let (gateway, coordinator, recorder) = rig(&Settings::default());
    let h1 = DeviceRef::harp("Harp01");
    let h2 = DeviceRef::harp("Harp02");

    assert!(coordinator.daq_start(&[h1.clone(), h2.clone()], 2).await);
    // No start command goes to the hardware: sampling is triggered
    // externally before daq_start.
    assert!(gateway.commands().is_empty());
    assert_eq!(
        recorder.events(),
        vec![Event::Initiated(
            vec!["Harp01".into(), "Harp02".into()],
            2
        )]
    );

    for _ in 0..2 {
        gateway.fire(&h1, FieldDescriptor::SampleArray, 1.0);
    }
    for _ in 0..2 {
        gateway.fire(&h2, FieldDescriptor::SampleArray, 1.0);
    }

    assert!(wait_until(|| recorder.count(|e| matches!(e, Event::Completed(_))) == 1).await);
    let events = recorder.events();
    let h1_samples: Vec<&Event> = events
        .iter()
        .filter(|e| matches!(e, Event::Sampled(d, _) if d == "Harp01"))
        .collect();
    assert_eq!(
        h1_samples,
        vec![
            &Event::Sampled("Harp01".into(), 1),
            &Event::Sampled("Harp01".into(), 2)
        ]
    );
    assert!(events.contains(&Event::Completed(vec![
        "Harp01".into(),
        "Harp02".into()
    ])));

    let status = coordinator.status().await;
    assert!(!status.active);
    assert_eq!(status.scanning, 0);
    assert_eq!(status.completed, 2);
    assert_eq!(gateway.active_monitor_count(), 0);
}

#[tokio::test]
async fn deliveries_past_the_target_are_discarded() {
    let (gateway, coordinator, recorder) = rig(&Settings::default());
    let h1 = DeviceRef::harp("Harp01");

    assert!(coordinator.daq_start(&[h1.clone()], 1).await);
    for _ in 0..4 {
        gateway.fire(&h1, FieldDescriptor::SampleArray, 1.0);
    }

    assert!(wait_until(|| recorder.count(|e| matches!(e, Event::Completed(_))) == 1).await);
    assert_eq!(recorder.count(|e| matches!(e, Event::Sampled(_, _))), 1);
}

#[tokio::test]
async fn zero_sample_count_selects_configured_default() {
    let mut settings = Settings::default();
    settings.scan.harp_sample_count = 2;
    let (gateway, coordinator, recorder) = rig(&settings);
    let h1 = DeviceRef::harp("Harp01");

    assert!(coordinator.daq_start(&[h1.clone()], 0).await);
    assert_eq!(
        recorder.events(),
        vec![Event::Initiated(vec!["Harp01".into()], 2)]
    );

    gateway.fire(&h1, FieldDescriptor::SampleArray, 1.0);
    gateway.fire(&h1, FieldDescriptor::SampleArray, 1.0);
    assert!(wait_until(|| recorder.count(|e| matches!(e, Event::Completed(_))) == 1).await);
}

#[tokio::test]
async fn second_daq_start_is_rejected() {
    let (_gateway, coordinator, recorder) = rig(&Settings::default());
    let h1 = DeviceRef::harp("Harp01");
    let h2 = DeviceRef::harp("Harp02");

    assert!(coordinator.daq_start(&[h1.clone()], 3).await);
    assert!(!coordinator.daq_start(&[h2.clone()], 3).await);

    let status = coordinator.status().await;
    assert!(status.active);
    assert_eq!(status.scanning, 1);
    assert_eq!(recorder.count(|e| matches!(e, Event::Initiated(_, _))), 1);
}

#[tokio::test]
async fn daq_abort_terminates_and_is_idempotent() {
    let (gateway, coordinator, recorder) = rig(&Settings::default());
    let h1 = DeviceRef::harp("Harp01");

    assert!(coordinator.daq_start(&[h1.clone()], 3).await);
    coordinator.daq_abort().await;

    // Harps have no abort command wired; termination is bookkeeping only.
    assert!(gateway.commands().is_empty());
    assert_eq!(recorder.count(|e| *e == Event::Aborted), 1);
    assert!(!coordinator.status().await.active);
    assert_eq!(gateway.active_monitor_count(), 0);

    coordinator.daq_abort().await;
    assert_eq!(recorder.count(|e| *e == Event::Aborted), 1);
}

#[tokio::test]
async fn subscription_refusal_rejects_the_session() {
    let (gateway, coordinator, recorder) = rig(&Settings::default());
    gateway.refuse_subscriptions();
    let h1 = DeviceRef::harp("Harp01");

    assert!(!coordinator.daq_start(&[h1.clone()], 3).await);
    assert!(recorder.events().is_empty());
    assert!(!coordinator.status().await.active);
}

#[tokio::test]
async fn events_after_completion_are_inert() {
    let (gateway, coordinator, recorder) = rig(&Settings::default());
    let h1 = DeviceRef::harp("Harp01");

    assert!(coordinator.daq_start(&[h1.clone()], 1).await);
    gateway.fire(&h1, FieldDescriptor::SampleArray, 1.0);
    assert!(wait_until(|| recorder.count(|e| matches!(e, Event::Completed(_))) == 1).await);

    let before = recorder.events().len();
    gateway.fire(&h1, FieldDescriptor::SampleArray, 1.0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(recorder.events().len(), before);
}
