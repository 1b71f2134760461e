//! Guard protocol tests: a controller and an actuator coordinating over a
//! simulated datagram network, with loss and duplication thrown in.

use rs_shunter::hal::{MockLever, MockMotor, MockPin, MockSocket};
use rs_shunter::traits::{Endpoint, LeverDirection};
use rs_shunter::{
    AbsoluteDirection, ActuatorState, ControllerState, DigitalDetector, EdgeDetector, GuardActuator,
    GuardConfig, GuardController, Locomotive, Profile, RelativeDirection, ThresholdConverter,
};

const CONTROLLER_ADDR: Endpoint = Endpoint::Unicast(1);
const ACTUATOR_ADDR: Endpoint = Endpoint::Unicast(2);

type EndSensor = EdgeDetector<ThresholdConverter<DigitalDetector<MockPin>>>;
type Controller = GuardController<MockSocket, MockLever>;
type Actuator = GuardActuator<MockMotor, MockSocket, EndSensor, EndSensor>;

fn end_sensor() -> EndSensor {
    EdgeDetector::new(ThresholdConverter::new(
        DigitalDetector::new(MockPin::new()),
        1,
    ))
}

fn make_pair() -> (Controller, Actuator) {
    let config = GuardConfig::default()
        .with_poll_period_ms(10)
        .with_retry_ms(100);
    let controller = GuardController::new(MockSocket::new(), MockLever::new(), config, 0);
    let engine = Locomotive::new(
        MockMotor::new(),
        Profile::named("test").unwrap(),
        AbsoluteDirection::Left,
    );
    let actuator = GuardActuator::new(
        engine,
        MockSocket::new(),
        end_sensor(),
        end_sensor(),
        config,
        0,
    );
    (controller, actuator)
}

/// Deliver everything each endpoint has sent into the other's receive
/// queue. Broadcast and the peer's unicast address both arrive.
fn pump(controller: &mut Controller, actuator: &mut Actuator) {
    let from_controller = std::mem::take(&mut controller.socket_mut().sent);
    for (message, _dest) in from_controller {
        actuator
            .socket_mut()
            .queue_incoming(message.as_bytes(), CONTROLLER_ADDR);
    }
    let from_actuator = std::mem::take(&mut actuator.socket_mut().sent);
    for (message, _dest) in from_actuator {
        controller
            .socket_mut()
            .queue_incoming(message.as_bytes(), ACTUATOR_ADDR);
    }
}

/// Run both endpoints with message delivery between every tick.
fn run_network(controller: &mut Controller, actuator: &mut Actuator, from: u32, to: u32) {
    for now in from..to {
        controller.poll(now);
        pump(controller, actuator);
        actuator.poll(now).unwrap();
        pump(controller, actuator);
    }
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn marco_polo_discovery_completes() {
    let (mut controller, mut actuator) = make_pair();
    run_network(&mut controller, &mut actuator, 0, 100);

    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(controller.peer(), Some(ACTUATOR_ADDR));
    assert_eq!(actuator.state(), ActuatorState::Listening);
}

#[test]
fn discovery_survives_total_loss_then_recovers() {
    let (mut controller, mut actuator) = make_pair();

    // network down: the controller's datagrams go nowhere
    for now in 0..300 {
        controller.poll(now);
        controller.socket_mut().sent.clear(); // all lost
        actuator.poll(now).unwrap();
    }
    assert_eq!(controller.state(), ControllerState::Identify);

    // network restored: the next MARCO retry gets through
    run_network(&mut controller, &mut actuator, 300, 500);
    assert_eq!(controller.state(), ControllerState::Stopped);
}

#[test]
fn duplicate_polo_is_harmless() {
    let (mut controller, mut actuator) = make_pair();
    run_network(&mut controller, &mut actuator, 0, 100);

    // a stale duplicate arrives later
    controller.socket_mut().queue_incoming(b"POLO", ACTUATOR_ADDR);
    run_network(&mut controller, &mut actuator, 100, 150);
    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(controller.peer(), Some(ACTUATOR_ADDR));
}

// ============================================================================
// Manual driving
// ============================================================================

/// Bring the pair to the Manual state.
fn manual_pair() -> (Controller, Actuator, u32) {
    let (mut controller, mut actuator) = make_pair();
    run_network(&mut controller, &mut actuator, 0, 100);
    controller.lever_mut().set(50, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, 100, 150);
    controller.lever_mut().set(0, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, 150, 200);
    assert_eq!(controller.state(), ControllerState::Manual);
    (controller, actuator, 200)
}

#[test]
fn lever_movement_drives_the_remote_locomotive() {
    let (mut controller, mut actuator, now) = manual_pair();

    controller.lever_mut().set(50, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, now, now + 300);

    assert_eq!(actuator.state(), ActuatorState::Manual);
    // 50% of max speed 12
    assert!((actuator.engine().velocity() - 6.0).abs() < 1e-3);
    assert_eq!(
        actuator.engine().velocity_direction(),
        RelativeDirection::Forward
    );
}

#[test]
fn duplicated_control_datagrams_do_not_change_the_outcome() {
    let (mut controller, mut actuator, now) = manual_pair();
    controller.lever_mut().set(50, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, now, now + 300);
    let velocity = actuator.engine().velocity();

    // the same command delivered three more times
    for _ in 0..3 {
        actuator
            .socket_mut()
            .queue_incoming(b"CONTROL F 50", CONTROLLER_ADDR);
    }
    run_network(&mut controller, &mut actuator, now + 300, now + 400);
    assert!((actuator.engine().velocity() - velocity).abs() < 1e-6);
}

#[test]
fn direction_flip_escape_stops_the_train() {
    let (mut controller, mut actuator, mut now) = manual_pair();
    controller.lever_mut().set(30, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, now, now + 200);
    now += 200;
    assert!(actuator.engine().velocity() > 0.0);

    // lever back to zero, then rattle the direction switch
    for direction in [
        LeverDirection::Reverse,
        LeverDirection::Forward,
        LeverDirection::Reverse,
        LeverDirection::Forward,
        LeverDirection::Reverse,
    ] {
        controller.lever_mut().set(0, direction);
        run_network(&mut controller, &mut actuator, now, now + 50);
        now += 50;
    }

    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(actuator.state(), ActuatorState::Listening);
    assert_eq!(actuator.engine().velocity(), 0.0);
}

// ============================================================================
// Automatic mode
// ============================================================================

/// Bring the pair to Automatic.
fn automatic_pair() -> (Controller, Actuator, u32) {
    let (mut controller, mut actuator) = make_pair();
    run_network(&mut controller, &mut actuator, 0, 100);
    controller.lever_mut().set(50, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, 100, 150);
    controller.lever_mut().set(100, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, 150, 250);
    assert_eq!(controller.state(), ControllerState::Automatic);
    assert_eq!(actuator.state(), ActuatorState::Automatic);
    (controller, actuator, 250)
}

#[test]
fn auto_handshake_reaches_both_ends() {
    let (_controller, mut actuator, _now) = automatic_pair();
    // cruising on its own
    assert!(actuator.engine().velocity() > 0.0);
}

#[test]
fn end_sensor_feedback_reaches_the_controller() {
    let (mut controller, mut actuator, now) = automatic_pair();
    run_network(&mut controller, &mut actuator, now, now + 200);

    // the train reaches the forward end of the run
    set_forward_end(&mut actuator);
    run_network(&mut controller, &mut actuator, now + 200, now + 400);

    assert_eq!(controller.end_feedback(), Some(RelativeDirection::Forward));
    // and the actuator is running back the other way
    assert!(actuator.engine().velocity() < 0.0);
}

/// Replace the forward end sensor with one whose pin is high.
fn set_forward_end(actuator: &mut Actuator) {
    let mut pin = MockPin::new();
    pin.set_level(true);
    *actuator.forward_sensor_mut() =
        EdgeDetector::new(ThresholdConverter::new(DigitalDetector::new(pin), 1));
}

#[test]
fn operator_override_leaves_automatic_everywhere() {
    let (mut controller, mut actuator, now) = automatic_pair();
    run_network(&mut controller, &mut actuator, now, now + 100);

    // the operator grabs the lever (80 is outside the mode-select band,
    // so the controller settles in Stopped)
    controller.lever_mut().set(80, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, now + 100, now + 300);

    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(actuator.state(), ActuatorState::Listening);
    assert_eq!(actuator.engine().velocity(), 0.0);
}

// ============================================================================
// Robustness
// ============================================================================

#[test]
fn garbled_traffic_is_echoed_and_ignored() {
    let (mut controller, mut actuator) = make_pair();
    run_network(&mut controller, &mut actuator, 0, 100);

    actuator
        .socket_mut()
        .queue_incoming(b"%%% noise !!!", CONTROLLER_ADDR);
    run_network(&mut controller, &mut actuator, 100, 200);

    // both ends carry on as if nothing happened
    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(actuator.state(), ActuatorState::Listening);
}

#[test]
fn controller_cancel_stops_the_remote_train() {
    let (mut controller, mut actuator, now) = manual_pair();
    controller.lever_mut().set(40, LeverDirection::Forward);
    run_network(&mut controller, &mut actuator, now, now + 300);
    assert!(actuator.engine().velocity() > 0.0);

    // after cancellation the controller loop exits; only the actuator
    // keeps running, acting on the final STOP
    controller.cancel();
    pump(&mut controller, &mut actuator);
    for tick in (now + 300)..(now + 400) {
        actuator.poll(tick).unwrap();
    }

    assert_eq!(actuator.state(), ActuatorState::Listening);
    assert_eq!(actuator.engine().velocity(), 0.0);
}
