//! Reconciliation handlers
//!
//! A handler decodes its frame completely into [`StateUpdate`]s before
//! touching the model, so a malformed payload never leaves a device
//! half-updated. Writes then go through the model's change-detecting
//! setters, which makes replaying a frame a no-op.

use crate::classifier::Route;
use crate::cluster::{
    id, on_off_attrs, power_attrs, profiles, temperature_attrs, MAX_TIMED_ON_MINUTES,
};
use crate::device::{ButtonState, DeviceModel, FirmwareInfo};
use crate::driver::CapabilityCommand;
use crate::handshake::TaskKind;
use crate::profile::{DeviceKind, DeviceProfile};
use zcl_protocol::{
    codec::{signal_percent, ButtonAction, Heartbeat, HelloResponse},
    decode, encode, endpoints, AttributeValue, DecodeError, Decoded, InboundFrame, OnOffCommand,
    OutboundCommand, OutboundPayload,
};

/// A single field write derived from a decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Voltage(f64),
    Battery(u8),
    Temperature(f64),
    Signal(u8),
    Button(ButtonState),
    Firmware(FirmwareInfo),
    Zone { zone: u8, on: bool },
}

/// Side effects a handler asks the lane to carry out
#[derive(Debug, Default)]
pub struct HandlerOutcome {
    pub outbound: Vec<OutboundCommand>,
    /// Handshake responses: `(task, success)`
    pub acks: Vec<(TaskKind, bool)>,
    /// The frame counts as a sign of life
    pub heartbeat: bool,
}

impl HandlerOutcome {
    fn send(&mut self, command: OutboundCommand) {
        self.outbound.push(command);
    }
}

/// Build an outbound command for `payload` on `cluster_id`
#[must_use]
pub fn command_for(profile_id: u16, endpoint: u8, cluster_id: u16, payload: &OutboundPayload) -> OutboundCommand {
    let bytes = encode(payload);
    if payload.is_cluster_specific() {
        OutboundCommand::cluster_command(profile_id, endpoint, cluster_id, payload.command_id(), bytes)
    } else {
        OutboundCommand::global_command(profile_id, endpoint, cluster_id, payload.command_id(), bytes)
    }
}

/// Ask a button to identify itself
#[must_use]
pub fn hello_request() -> OutboundCommand {
    command_for(
        profiles::ALERTME,
        endpoints::ALERTME,
        id::ALERTME_JOIN,
        &OutboundPayload::HelloRequest,
    )
}

fn stop_polling() -> OutboundCommand {
    command_for(
        profiles::ALERTME,
        endpoints::ALERTME,
        id::ALERTME_GENERAL,
        &OutboundPayload::StopPolling,
    )
}

/// Handle one classified frame
pub fn reconcile(
    route: Route,
    frame: &InboundFrame,
    model: &mut DeviceModel,
    profile: &DeviceProfile,
) -> Result<HandlerOutcome, DecodeError> {
    let mut outcome = HandlerOutcome {
        heartbeat: route.is_heartbeat(),
        ..HandlerOutcome::default()
    };

    match route {
        Route::Unhandled => {
            tracing::debug!(
                "Unhandled frame from {}: profile=0x{:04X} cluster=0x{:04X} cmd=0x{:02X} ep={} len={}",
                model.state().id,
                frame.profile_id,
                frame.cluster_id,
                frame.command_id,
                frame.endpoint,
                frame.payload.len()
            );
            return Ok(outcome);
        }
        // Unknown codes are ignored rather than treated as malformed
        Route::Button if ButtonAction::from_command(frame.command_id).is_none() => {
            tracing::info!(
                "Ignoring unknown button code 0x{:02X} from {}",
                frame.command_id,
                model.state().id
            );
            return Ok(outcome);
        }
        _ => {}
    }

    match decode(frame)? {
        Decoded::Heartbeat(heartbeat) => {
            apply(model, heartbeat_updates(&heartbeat, profile));
            outcome.send(stop_polling());
        }
        Decoded::Button(action) => apply(model, vec![StateUpdate::Button(button_state(action))]),
        Decoded::Hello(hello) => apply(model, vec![StateUpdate::Firmware(firmware_info(&hello))]),
        Decoded::CheckIn => {
            outcome.send(command_for(
                profiles::HOME_AUTOMATION,
                frame.endpoint,
                id::POLL_CONTROL,
                &OutboundPayload::CheckInResponse {
                    start_fast_polling: false,
                    fast_poll_timeout: 0,
                },
            ));
        }
        Decoded::Report(records) => {
            let values: Vec<_> = records.iter().map(|r| (r.attribute_id, &r.value)).collect();
            apply(model, attribute_updates(frame, profile, &values));
        }
        Decoded::ReadResponse(records) => {
            for record in records.iter().filter(|r| r.status != 0) {
                tracing::debug!(
                    "Read of 0x{:04X}/0x{:04X} failed with status 0x{:02X}",
                    frame.cluster_id,
                    record.attribute_id,
                    record.status
                );
            }
            let values: Vec<_> = records
                .iter()
                .filter_map(|r| r.value.as_ref().map(|v| (r.attribute_id, v)))
                .collect();
            apply(model, attribute_updates(frame, profile, &values));
        }
        Decoded::ConfigureReportingResponse(response) => {
            match TaskKind::from_reporting_response(frame.cluster_id) {
                Some(kind) => outcome.acks.push((kind, response.is_success())),
                None => tracing::debug!(
                    "Configure reporting response on unmanaged cluster 0x{:04X}",
                    frame.cluster_id
                ),
            }
        }
        Decoded::WriteAttributesResponse(response) => {
            match TaskKind::from_write_response(frame.cluster_id) {
                Some(kind) => outcome.acks.push((kind, response.is_success())),
                None => tracing::debug!(
                    "Write attributes response on unmanaged cluster 0x{:04X}",
                    frame.cluster_id
                ),
            }
        }
        Decoded::DefaultResponse { command_id, status } => {
            if status == 0 {
                tracing::debug!(
                    "Default response for cmd 0x{:02X} on cluster 0x{:04X}",
                    command_id,
                    frame.cluster_id
                );
            } else {
                tracing::warn!(
                    "Device {} rejected cmd 0x{:02X} on cluster 0x{:04X}: status 0x{:02X}",
                    model.state().id,
                    command_id,
                    frame.cluster_id,
                    status
                );
            }
        }
    }

    Ok(outcome)
}

fn button_state(action: ButtonAction) -> ButtonState {
    match action {
        ButtonAction::Pressed => ButtonState::Pressed,
        ButtonAction::Released => ButtonState::Released,
    }
}

fn heartbeat_updates(heartbeat: &Heartbeat, profile: &DeviceProfile) -> Vec<StateUpdate> {
    let mut updates = Vec::new();
    if let Some(volts) = heartbeat.voltage {
        updates.push(StateUpdate::Voltage(volts));
        updates.push(StateUpdate::Battery(profile.battery_curve().percent(volts)));
    }
    if let Some(celsius) = heartbeat.temperature {
        updates.push(StateUpdate::Temperature(celsius));
    }
    if let Some(lqi) = heartbeat.lqi {
        updates.push(StateUpdate::Signal(signal_percent(lqi)));
    }
    updates
}

fn firmware_info(hello: &HelloResponse) -> FirmwareInfo {
    FirmwareInfo {
        node_id: hello.node_id,
        manufacturer_id: hello.manufacturer_id,
        device_type: hello.device_type,
        app_version: hello.app_version_string(),
        hw_version: hello.hw_version_string(),
    }
}

/// Map reported or read attribute values to state updates
fn attribute_updates(
    frame: &InboundFrame,
    profile: &DeviceProfile,
    values: &[(u16, &AttributeValue)],
) -> Vec<StateUpdate> {
    let mut updates = Vec::new();
    match frame.cluster_id {
        id::POWER_CONFIG => {
            let mut voltage = None;
            let mut percent = None;
            for (attr, value) in values {
                match (*attr, value) {
                    (power_attrs::BATTERY_VOLTAGE, AttributeValue::Uint8(raw)) => {
                        voltage = Some(f64::from(*raw) / 10.0);
                    }
                    // 0xFF means the device does not know
                    (power_attrs::BATTERY_PERCENTAGE_REMAINING, AttributeValue::Uint8(raw))
                        if *raw != 0xFF =>
                    {
                        percent = Some(raw / 2);
                    }
                    (power_attrs::BATTERY_VOLTAGE | power_attrs::BATTERY_PERCENTAGE_REMAINING, other) => {
                        tracing::debug!("Ignoring battery attribute 0x{:04X} as {:?}", attr, other);
                    }
                    _ => {}
                }
            }
            if let Some(volts) = voltage {
                updates.push(StateUpdate::Voltage(volts));
            }
            if let Some(pct) = percent.or_else(|| voltage.map(|v| profile.battery_curve().percent(v))) {
                updates.push(StateUpdate::Battery(pct));
            }
        }
        id::ON_OFF => {
            let Some(zone) = profile.zone_for_endpoint(frame.endpoint) else {
                tracing::debug!("On/off report from endpoint {} with no zone", frame.endpoint);
                return updates;
            };
            for (attr, value) in values {
                if *attr == on_off_attrs::ON_OFF {
                    if let Some(raw) = value.as_i64() {
                        updates.push(StateUpdate::Zone { zone, on: raw != 0 });
                    }
                }
            }
        }
        id::THERMOSTAT | id::TEMPERATURE_MEASUREMENT => {
            for (attr, value) in values {
                if *attr != temperature_attrs::MEASURED_VALUE {
                    continue;
                }
                match value {
                    AttributeValue::Int16(temperature_attrs::INVALID) => {
                        tracing::debug!("Temperature sensor reported no reading");
                    }
                    AttributeValue::Int16(centi) => {
                        updates.push(StateUpdate::Temperature(f64::from(*centi) / 100.0));
                    }
                    other => tracing::debug!("Unexpected temperature value {:?}", other),
                }
            }
        }
        cluster => {
            tracing::debug!("Ignoring attributes on unmodeled cluster 0x{:04X}", cluster);
        }
    }
    updates
}

/// Write decoded updates through the model
pub fn apply(model: &mut DeviceModel, updates: Vec<StateUpdate>) {
    for update in updates {
        match update {
            StateUpdate::Voltage(volts) => {
                model.set_voltage(volts);
            }
            StateUpdate::Battery(percent) => {
                model.set_battery(percent);
            }
            StateUpdate::Temperature(celsius) => {
                model.set_temperature(celsius);
            }
            StateUpdate::Signal(percent) => {
                model.set_signal(percent);
            }
            StateUpdate::Button(state) => {
                model.set_button(state);
            }
            StateUpdate::Firmware(info) => {
                model.set_firmware(info);
            }
            StateUpdate::Zone { zone, on } => {
                if model.set_zone_on(zone, on).is_none() {
                    tracing::warn!("Zone {} does not exist on {}", zone, model.state().id);
                }
            }
        }
    }
}

/// Handle a capability command; `Configure` is handled by the driver
pub fn execute(
    command: &CapabilityCommand,
    model: &mut DeviceModel,
    profile: &DeviceProfile,
) -> HandlerOutcome {
    let mut outcome = HandlerOutcome::default();
    let zone_endpoint = |zone: u8| {
        let endpoint = profile.zone_endpoint(zone);
        if endpoint.is_none() {
            tracing::warn!(
                "Ignoring {:?}: zone {} out of range (1-{})",
                command,
                zone,
                profile.zone_count
            );
        }
        endpoint
    };
    let on_off = |endpoint: u8, payload: OutboundPayload| {
        command_for(profiles::HOME_AUTOMATION, endpoint, id::ON_OFF, &payload)
    };

    match command {
        CapabilityCommand::SetButton(literal) => match ButtonState::from_literal(literal) {
            Some(state) => apply(model, vec![StateUpdate::Button(state)]),
            None => tracing::info!("Ignoring unknown button literal {:?}", literal),
        },
        CapabilityCommand::ZoneOn { zone } => {
            if let Some(endpoint) = zone_endpoint(*zone) {
                outcome.send(on_off(endpoint, OutboundPayload::OnOff(OnOffCommand::On)));
            }
        }
        CapabilityCommand::ZoneOff { zone } => {
            if let Some(endpoint) = zone_endpoint(*zone) {
                outcome.send(on_off(endpoint, OutboundPayload::OnOff(OnOffCommand::Off)));
            }
        }
        CapabilityCommand::WaterZone { zone, minutes } => {
            if let Some(endpoint) = zone_endpoint(*zone) {
                let requested = minutes
                    .or_else(|| model.zone(*zone).map(|z| z.default_duration_minutes))
                    .unwrap_or(profile.default_zone_minutes);
                if requested > MAX_TIMED_ON_MINUTES {
                    tracing::warn!(
                        "Watering time {} min exceeds {} min, capping",
                        requested,
                        MAX_TIMED_ON_MINUTES
                    );
                }
                let minutes = requested.min(MAX_TIMED_ON_MINUTES);
                outcome.send(on_off(
                    endpoint,
                    OutboundPayload::OnWithTimedOff {
                        on_time: minutes * 600,
                        off_wait_time: 0,
                    },
                ));
            }
        }
        CapabilityCommand::SetZoneDuration { zone, minutes } => {
            if model.set_zone_duration(*zone, *minutes).is_none() {
                tracing::warn!(
                    "Ignoring duration for zone {}: out of range (1-{})",
                    zone,
                    profile.zone_count
                );
            }
        }
        CapabilityCommand::Refresh => match profile.kind {
            DeviceKind::Button => outcome.send(hello_request()),
            DeviceKind::IrrigationController => {
                let endpoint = profile.primary_endpoint();
                outcome.send(command_for(
                    profiles::HOME_AUTOMATION,
                    endpoint,
                    id::POWER_CONFIG,
                    &OutboundPayload::ReadAttributes(vec![
                        power_attrs::BATTERY_VOLTAGE,
                        power_attrs::BATTERY_PERCENTAGE_REMAINING,
                    ]),
                ));
                for zone in 1..=profile.zone_count {
                    if let Some(endpoint) = profile.zone_endpoint(zone) {
                        outcome.send(on_off(
                            endpoint,
                            OutboundPayload::ReadAttributes(vec![on_off_attrs::ON_OFF]),
                        ));
                    }
                }
                if profile.thermostat_reporting {
                    outcome.send(command_for(
                        profiles::HOME_AUTOMATION,
                        endpoint,
                        id::THERMOSTAT,
                        &OutboundPayload::ReadAttributes(vec![temperature_attrs::MEASURED_VALUE]),
                    ));
                }
            }
        },
        CapabilityCommand::Configure => {
            tracing::debug!("Configure is driven by the handshake controller");
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::commands;
    use crate::device::Field;
    use crate::ports::DeviceId;
    use crate::testing::Fakes;
    use zcl_protocol::GlobalCommand;

    fn button_model(fakes: &Fakes) -> (DeviceModel, DeviceProfile) {
        let profile = DeviceProfile::button();
        let model = DeviceModel::new(DeviceId::new("button-1"), &profile, fakes.store.clone(), fakes.clock.clone());
        (model, profile)
    }

    fn irrigation_model(fakes: &Fakes) -> (DeviceModel, DeviceProfile) {
        let profile = DeviceProfile::irrigation_controller(4);
        let model = DeviceModel::new(DeviceId::new("irr-1"), &profile, fakes.store.clone(), fakes.clock.clone());
        (model, profile)
    }

    fn heartbeat_frame() -> InboundFrame {
        let mut payload = vec![0u8; 11];
        payload[0] = 0x01 | 0x02 | 0x08;
        payload[5] = 0xE8;
        payload[6] = 0x0A;
        payload[7] = 0x35;
        payload[8] = 0x01;
        payload[10] = 0xC8;
        InboundFrame::cluster_specific(profiles::ALERTME, endpoints::ALERTME, id::ALERTME_GENERAL, 0xFB, payload)
    }

    #[test]
    fn test_heartbeat_updates_and_stops_polling() {
        let fakes = Fakes::new();
        let (mut model, profile) = button_model(&fakes);

        let outcome = reconcile(Route::Heartbeat, &heartbeat_frame(), &mut model, &profile).unwrap();
        assert!(outcome.heartbeat);
        assert_eq!(outcome.outbound.len(), 1);
        assert_eq!(outcome.outbound[0].command_id, commands::general::STOP_POLLING);
        assert_eq!(outcome.outbound[0].cluster_id, id::ALERTME_GENERAL);

        let state = model.state();
        assert_eq!(state.power.voltage, Some(2.792));
        assert_eq!(state.power.battery_percent, Some(77));
        assert_eq!(state.temperature.celsius, Some(19.3125));
        assert_eq!(state.connection.signal_percent, Some(78));
    }

    #[test]
    fn test_short_heartbeat_is_rejected_without_mutation() {
        let fakes = Fakes::new();
        let (mut model, profile) = button_model(&fakes);
        let mut frame = heartbeat_frame();
        frame.payload.truncate(9);

        let result = reconcile(Route::Heartbeat, &frame, &mut model, &profile);
        assert!(matches!(result, Err(DecodeError::TooShort { .. })));
        assert!(fakes.store.commits().is_empty());
        assert_eq!(model.state().power.voltage, None);
    }

    #[test]
    fn test_unknown_button_code_is_ignored() {
        let fakes = Fakes::new();
        let (mut model, profile) = button_model(&fakes);
        let frame = InboundFrame::cluster_specific(profiles::ALERTME, 2, id::ALERTME_BUTTON, 7, Vec::new());
        let outcome = reconcile(Route::Button, &frame, &mut model, &profile).unwrap();
        assert!(outcome.outbound.is_empty());
        assert!(fakes.store.commits().is_empty());
        assert_eq!(model.state().button.state, ButtonState::Released);
    }

    #[test]
    fn test_button_codes_map_to_state() {
        let fakes = Fakes::new();
        let (mut model, profile) = button_model(&fakes);
        let press = InboundFrame::cluster_specific(profiles::ALERTME, 2, id::ALERTME_BUTTON, 1, Vec::new());
        let release = InboundFrame::cluster_specific(profiles::ALERTME, 2, id::ALERTME_BUTTON, 0, Vec::new());

        reconcile(Route::Button, &press, &mut model, &profile).unwrap();
        assert_eq!(model.state().button.state, ButtonState::Pressed);
        reconcile(Route::Button, &release, &mut model, &profile).unwrap();
        assert_eq!(model.state().button.state, ButtonState::Released);
        assert_eq!(fakes.store.commits().len(), 2);
    }

    #[test]
    fn test_hello_response_sets_firmware() {
        let fakes = Fakes::new();
        let (mut model, profile) = button_model(&fakes);
        let mut payload = vec![0u8; 18];
        payload[0] = 0x34;
        payload[1] = 0x12;
        payload[10] = 0x39;
        payload[11] = 0x10;
        payload[14] = 7;
        payload[15] = 0x23;
        payload[16] = 1;
        payload[17] = 2;
        let frame = InboundFrame::cluster_specific(profiles::ALERTME, 2, id::ALERTME_JOIN, 0xFE, payload);

        reconcile(Route::HelloResponse, &frame, &mut model, &profile).unwrap();
        let firmware = model.state().firmware.clone().unwrap();
        assert_eq!(firmware.node_id, 0x1234);
        assert_eq!(firmware.manufacturer_id, 0x1039);
        assert_eq!(firmware.app_version, "2.3.7");
        assert_eq!(firmware.hw_version, "2.1");
    }

    #[test]
    fn test_zone_report_maps_endpoint() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        // attr 0x0000, bool, true
        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 3, id::ON_OFF, 0x0A, vec![0x00, 0x00, 0x10, 0x01]);

        reconcile(Route::ReportAttributes, &frame, &mut model, &profile).unwrap();
        assert!(model.zone(3).unwrap().on);
        assert!(!model.zone(1).unwrap().on);
        assert_eq!(fakes.store.commits()[0].field, Field::ZoneSwitch(3));
    }

    #[test]
    fn test_power_report_prefers_explicit_percent() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        let payload = vec![
            0x20, 0x00, 0x20, 52, // 5.2 V
            0x21, 0x00, 0x20, 130, // 65%
        ];
        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::POWER_CONFIG, 0x0A, payload);
        reconcile(Route::ReportAttributes, &frame, &mut model, &profile).unwrap();
        assert_eq!(model.state().power.voltage, Some(5.2));
        assert_eq!(model.state().power.battery_percent, Some(65));

        // Voltage alone falls back to the discharge curve
        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::POWER_CONFIG, 0x0A, vec![0x20, 0x00, 0x20, 60]);
        reconcile(Route::ReportAttributes, &frame, &mut model, &profile).unwrap();
        assert_eq!(model.state().power.battery_percent, Some(100));
    }

    #[test]
    fn test_power_report_ignores_mistyped_percent() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        // int8 -20 for percentage remaining, then the unknown marker 0xFF
        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::POWER_CONFIG, 0x0A, vec![0x21, 0x00, 0x28, 0xEC]);
        reconcile(Route::ReportAttributes, &frame, &mut model, &profile).unwrap();
        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::POWER_CONFIG, 0x0A, vec![0x21, 0x00, 0x20, 0xFF]);
        reconcile(Route::ReportAttributes, &frame, &mut model, &profile).unwrap();
        assert_eq!(model.state().power.battery_percent, None);
        assert!(fakes.store.commits().is_empty());
    }

    #[test]
    fn test_thermostat_skips_invalid_reading() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::THERMOSTAT, 0x0A, vec![0x00, 0x00, 0x29, 0x00, 0x80]);
        reconcile(Route::ReportAttributes, &frame, &mut model, &profile).unwrap();
        assert_eq!(model.state().temperature.celsius, None);

        // 21.5 °C
        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::THERMOSTAT, 0x0A, vec![0x00, 0x00, 0x29, 0x66, 0x08]);
        reconcile(Route::ReportAttributes, &frame, &mut model, &profile).unwrap();
        assert_eq!(model.state().temperature.celsius, Some(21.5));
    }

    #[test]
    fn test_configure_response_yields_ack() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::POWER_CONFIG, 0x07, vec![0x00]);
        let outcome = reconcile(Route::ConfigureReportingResponse, &frame, &mut model, &profile).unwrap();
        assert_eq!(outcome.acks, vec![(TaskKind::PowerReporting, true)]);

        let frame = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::POLL_CONTROL, 0x04, vec![0x86, 0x00, 0x00]);
        let outcome = reconcile(Route::WriteAttributesResponse, &frame, &mut model, &profile).unwrap();
        assert_eq!(outcome.acks, vec![(TaskKind::PollControl, false)]);
    }

    #[test]
    fn test_check_in_is_answered() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        let frame = InboundFrame::cluster_specific(profiles::HOME_AUTOMATION, 1, id::POLL_CONTROL, 0x00, Vec::new());
        let outcome = reconcile(Route::PollCheckIn, &frame, &mut model, &profile).unwrap();
        assert!(outcome.heartbeat);
        assert_eq!(outcome.outbound.len(), 1);
        assert!(outcome.outbound[0].cluster_specific);
        assert_eq!(outcome.outbound[0].payload, vec![0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_water_zone_uses_default_duration() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        let outcome = execute(&CapabilityCommand::WaterZone { zone: 2, minutes: None }, &mut model, &profile);
        assert_eq!(outcome.outbound.len(), 1);
        let cmd = &outcome.outbound[0];
        assert_eq!(cmd.endpoint, 2);
        assert_eq!(cmd.command_id, OnOffCommand::OnWithTimedOff as u8);
        // 10 min = 6000 tenths
        assert_eq!(cmd.payload, vec![0x00, 0x70, 0x17, 0x00, 0x00]);
    }

    #[test]
    fn test_out_of_range_zone_is_ignored() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        assert!(execute(&CapabilityCommand::ZoneOn { zone: 5 }, &mut model, &profile).outbound.is_empty());
        assert!(execute(&CapabilityCommand::ZoneOff { zone: 0 }, &mut model, &profile).outbound.is_empty());
        execute(&CapabilityCommand::SetZoneDuration { zone: 9, minutes: 5 }, &mut model, &profile);
        assert!(fakes.store.commits().is_empty());
    }

    #[test]
    fn test_refresh_reads_every_zone() {
        let fakes = Fakes::new();
        let (mut model, profile) = irrigation_model(&fakes);
        let outcome = execute(&CapabilityCommand::Refresh, &mut model, &profile);
        assert_eq!(outcome.outbound.len(), 5);
        assert!(outcome
            .outbound
            .iter()
            .all(|c| c.command_id == GlobalCommand::ReadAttributes as u8 && !c.cluster_specific));
    }

    #[test]
    fn test_set_button_literal() {
        let fakes = Fakes::new();
        let (mut model, profile) = button_model(&fakes);
        execute(&CapabilityCommand::SetButton("pressed".into()), &mut model, &profile);
        assert_eq!(model.state().button.state, ButtonState::Pressed);
        execute(&CapabilityCommand::SetButton("held".into()), &mut model, &profile);
        assert_eq!(model.state().button.state, ButtonState::Pressed);
        assert_eq!(fakes.store.commits().len(), 1);
    }
}
