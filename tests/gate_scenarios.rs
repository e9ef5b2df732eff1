//! End-to-end scenarios for the gate controller: broker payload in, FSM
//! cycles, status/telemetry out.

use rs_gate::hal::{MockDelay, MockGate, MockMqtt};
use rs_gate::{
    parse_command, status_payload, BrokerConfig, CommandQueue, ErrorCode, GateFsm, GateState,
    StatusPublisher, COMMAND_QUEUE_DEPTH, PUB_PERIOD_MS,
};

/// Everything one simulated device needs: FSM, queue, broker mock, and the
/// publisher, driven by an explicit millisecond clock.
struct Harness {
    fsm: GateFsm<MockGate, MockDelay>,
    queue: CommandQueue<COMMAND_QUEUE_DEPTH>,
    mqtt: MockMqtt,
    publisher: StatusPublisher,
    broker: BrokerConfig,
    now_ms: u64,
}

impl Harness {
    fn new(limit_open: bool, limit_closed: bool) -> Self {
        let mut io = MockGate::new();
        io.set_limits(limit_open, limit_closed);
        Self {
            fsm: GateFsm::new(io, MockDelay::new()),
            queue: CommandQueue::new(),
            mqtt: MockMqtt::new(),
            publisher: StatusPublisher::new(0),
            broker: BrokerConfig::default()
                .with_uri("mqtt://broker:1883")
                .with_topics("gate/cmd", "gate/status", "gate/tele"),
            now_ms: 0,
        }
    }

    /// Decode one inbound broker payload exactly the way the broker channel
    /// does, dropping invalid ones.
    fn deliver(&mut self, payload: &[u8]) {
        if let Some(cmd) = parse_command(payload) {
            let _ = self.queue.push(cmd);
        }
    }

    /// Run one FSM cycle plus the telemetry tick.
    fn cycle(&mut self) {
        self.fsm.step(&mut self.queue, self.now_ms).unwrap();
        let snap = self.fsm.snapshot();
        self.publisher
            .tick(&snap, self.now_ms, &mut self.mqtt, &self.broker);
        self.now_ms += self.fsm.cycle_ms();
    }

    /// Run cycles until `deadline_ms` (exclusive) at the FSM's own cadence.
    fn run_until(&mut self, deadline_ms: u64) {
        while self.now_ms < deadline_ms {
            self.cycle();
        }
    }

    fn set_limits(&mut self, open: bool, closed: bool) {
        self.fsm.io_mut().set_limits(open, closed);
    }

    fn last_status(&self) -> serde_json::Value {
        let (_, payload, retain) = self.mqtt.published_to("gate/status").pop().unwrap();
        assert!(*retain);
        serde_json::from_slice(payload).unwrap()
    }
}

// ============================================================================
// Scenario 1: cold start, gate physically closed
// ============================================================================

#[test]
fn cold_start_closed_gate() {
    let mut h = Harness::new(false, true);
    h.cycle();

    assert_eq!(h.fsm.state(), GateState::Closed);

    let status = h.last_status();
    assert_eq!(status["state"], "CERRADO");
    assert_eq!(status["lsc_closed"], true);
    assert_eq!(status["lsa_open"], false);
    assert_eq!(status["motor_open"], false);
    assert_eq!(status["motor_close"], false);
    assert_eq!(status["err"], 0);
}

// ============================================================================
// Scenario 2: open command while closed
// ============================================================================

#[test]
fn open_command_runs_to_the_open_limit() {
    let mut h = Harness::new(false, true);
    h.cycle();

    h.deliver(br#"{"cmd":"OPEN"}"#);
    h.cycle();

    // Within one cycle the motor is on and the state is ABRIENDO.
    assert_eq!(h.fsm.state(), GateState::Opening);
    let snap = h.fsm.snapshot();
    assert!(snap.motor_opening);
    assert!(!snap.motor_closing);
    assert_eq!(h.last_status()["state"], "ABRIENDO");

    // Gate travels off the closed limit, then reaches the open limit after
    // eight seconds.
    h.set_limits(false, false);
    h.run_until(8_000);
    h.set_limits(true, false);
    h.run_until(8_100);

    assert_eq!(h.fsm.state(), GateState::Open);
    let status = h.last_status();
    assert_eq!(status["state"], "ABIERTO");
    assert_eq!(status["motor_open"], false);
    assert_eq!(status["err"], 0);
}

// ============================================================================
// Scenario 3: open timeout, then recovery by a close command
// ============================================================================

#[test]
fn open_timeout_faults_then_close_recovers() {
    let mut h = Harness::new(false, true);
    h.cycle();
    h.deliver(br#"{"cmd":"OPEN"}"#);
    h.cycle();
    let motion_started = h.now_ms;
    h.set_limits(false, false);

    // The open limit never asserts: the deadline expires 15 s after the
    // motion started.
    h.run_until(motion_started + 15_500);

    assert_eq!(h.fsm.state(), GateState::Error);
    assert_eq!(h.fsm.error_code(), ErrorCode::TimeoutOpen);
    let snap = h.fsm.snapshot();
    assert!(!snap.motor_opening && !snap.motor_closing);
    let status = h.last_status();
    assert_eq!(status["state"], "ERROR");
    assert_eq!(status["err"], 1);

    // A subsequent CLOSE drives the gate again (via UNKNOWN, since both
    // limits are off).
    h.deliver(br#"{"cmd":"CLOSE"}"#);
    h.cycle();
    h.cycle();
    assert_eq!(h.fsm.state(), GateState::Closing);
    assert!(h.fsm.snapshot().motor_closing);
    assert_eq!(h.last_status()["state"], "CERRANDO");
}

// ============================================================================
// Scenario 4: reversal mid-opening
// ============================================================================

#[test]
fn close_during_opening_reverses_with_fresh_deadline() {
    let mut h = Harness::new(false, true);
    h.cycle();
    h.deliver(br#"{"cmd":"OPEN"}"#);
    h.cycle();
    h.set_limits(false, false);
    h.run_until(2_000);

    h.deliver(br#"{"cmd":"CLOSE"}"#);
    let reversal_at = h.now_ms;
    h.cycle();

    // Within one cycle the motor has swapped direction.
    assert_eq!(h.fsm.state(), GateState::Closing);
    let snap = h.fsm.snapshot();
    assert!(!snap.motor_opening);
    assert!(snap.motor_closing);
    assert_eq!(h.last_status()["state"], "CERRANDO");

    // The deadline was reset at the reversal: still closing just before
    // reversal + 15 s, faulted just after.
    h.run_until(reversal_at + 15_000);
    assert_eq!(h.fsm.state(), GateState::Closing);
    h.run_until(reversal_at + 15_100);
    assert_eq!(h.fsm.state(), GateState::Error);
    assert_eq!(h.fsm.error_code(), ErrorCode::TimeoutClose);
}

// ============================================================================
// Inconsistent limit switches
// ============================================================================

#[test]
fn both_limits_asserted_reports_err_3() {
    let mut h = Harness::new(false, true);
    h.cycle();

    h.set_limits(true, true);
    // The open switch needs its 20 ms debounce window before both read
    // asserted; after that one cycle lands in ERROR.
    h.run_until(h.now_ms + 60);

    assert_eq!(h.fsm.state(), GateState::Error);
    let status = h.last_status();
    assert_eq!(status["state"], "ERROR");
    assert_eq!(status["err"], 3);
}

// ============================================================================
// Idempotence: repeated commands produce no extra transitions
// ============================================================================

#[test]
fn repeated_open_produces_no_transition_messages() {
    let mut h = Harness::new(true, false);
    h.cycle();
    assert_eq!(h.fsm.state(), GateState::Open);
    let baseline = h.mqtt.published_to("gate/status").len();

    h.deliver(br#"{"cmd":"OPEN"}"#);
    h.deliver(br#"{"cmd":"OPEN"}"#);
    h.cycle();
    h.cycle();
    h.cycle();

    assert_eq!(h.fsm.state(), GateState::Open);
    assert_eq!(h.mqtt.published_to("gate/status").len(), baseline);
}

// ============================================================================
// Lamp commands pass through without touching motion
// ============================================================================

#[test]
fn lamp_payloads_only_touch_the_lamp() {
    let mut h = Harness::new(false, true);
    h.cycle();
    let baseline = h.mqtt.published_to("gate/status").len();

    h.deliver(br#"{"cmd":"LAMP_ON"}"#);
    h.cycle();
    assert!(h.fsm.snapshot().lamp);
    assert_eq!(h.fsm.state(), GateState::Closed);

    h.deliver(br#"{"cmd":"lamp_off"}"#);
    h.cycle();
    assert!(!h.fsm.snapshot().lamp);
    assert_eq!(h.mqtt.published_to("gate/status").len(), baseline);
}

// ============================================================================
// Malformed payloads are dropped silently
// ============================================================================

#[test]
fn garbage_payloads_do_nothing() {
    let mut h = Harness::new(false, true);
    h.cycle();

    h.deliver(b"OPEN");
    h.deliver(br#"{"cmd":"JUMP"}"#);
    h.deliver(br#"{"other":"OPEN"}"#);
    h.deliver(b"");
    h.cycle();
    h.cycle();

    assert_eq!(h.fsm.state(), GateState::Closed);
    assert!(h.queue.is_empty());
}

// ============================================================================
// Telemetry cadence in a steady state
// ============================================================================

#[test]
fn telemetry_keeps_flowing_while_idle() {
    let mut h = Harness::new(false, true);
    h.run_until(2 * PUB_PERIOD_MS + 100);

    let tele = h.mqtt.published_to("gate/tele");
    assert_eq!(tele.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&tele[0].1).unwrap();
    assert_eq!(body["state"], "CERRADO");

    // Exactly one status message: the state never changed.
    assert_eq!(h.mqtt.published_to("gate/status").len(), 1);
}

// ============================================================================
// Queue overflow: sixteen commands kept, later arrivals dropped
// ============================================================================

#[test]
fn queue_overflow_preserves_oldest_sixteen() {
    let mut h = Harness::new(false, true);
    h.cycle();

    for _ in 0..COMMAND_QUEUE_DEPTH {
        h.deliver(br#"{"cmd":"LAMP_ON"}"#);
    }
    // Seventeenth command is dropped on the floor.
    h.deliver(br#"{"cmd":"OPEN"}"#);

    assert_eq!(h.queue.len(), COMMAND_QUEUE_DEPTH);
    h.run_until(h.now_ms + COMMAND_QUEUE_DEPTH as u64 * 20 + 40);

    // Only lamp commands were consumed: the gate never moved.
    assert_eq!(h.fsm.state(), GateState::Closed);
    assert!(h.fsm.snapshot().lamp);
}

// ============================================================================
// Connect announcement payload omits err
// ============================================================================

#[test]
fn connect_announcement_has_no_err_field() {
    let h = Harness::new(false, true);
    let payload = status_payload(&h.fsm.snapshot(), false);
    let body: serde_json::Value = serde_json::from_str(&payload).unwrap();

    assert!(body.get("err").is_none());
    assert_eq!(body["state"], "INICIAL");
}
