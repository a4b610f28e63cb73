//! Inbound message classification
//!
//! The classifier is a pure lookup from a frame's identifiers to a
//! [`Route`]. Tables are built once per device kind and shared by every
//! device of that kind.

use crate::cluster::{commands, id, profiles};
use crate::profile::DeviceKind;
use std::collections::HashMap;
use zcl_protocol::{GlobalCommand, InboundFrame};

/// Handler a frame is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Heartbeat,
    Button,
    HelloResponse,
    PollCheckIn,
    ReportAttributes,
    ReadAttributesResponse,
    ConfigureReportingResponse,
    WriteAttributesResponse,
    DefaultResponse,
    /// Not modeled by this driver; logged and dropped
    Unhandled,
}

impl Route {
    /// Frames on this route count as a sign of life
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Route::Heartbeat | Route::PollCheckIn)
    }
}

/// Cluster-specific dispatch key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub profile_id: u16,
    pub cluster_id: u16,
    pub command_id: u8,
}

impl MessageKey {
    #[must_use]
    pub fn new(profile_id: u16, cluster_id: u16, command_id: u8) -> Self {
        Self {
            profile_id,
            cluster_id,
            command_id,
        }
    }
}

/// Lookup tables for one device kind
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    /// (profile, cluster, command) for cluster-specific frames
    commands: HashMap<MessageKey, Route>,
    /// (profile, cluster) for clusters whose every command goes to one handler
    clusters: HashMap<(u16, u16), Route>,
    /// (profile, command) for global frames on any cluster
    globals: HashMap<(u16, u8), Route>,
}

impl Classifier {
    /// Build the table for a device kind
    #[must_use]
    pub fn for_kind(kind: DeviceKind) -> Self {
        let mut classifier = Self::default();
        match kind {
            DeviceKind::Button => {
                classifier
                    .command(
                        MessageKey::new(profiles::ALERTME, id::ALERTME_GENERAL, commands::general::HEARTBEAT),
                        Route::Heartbeat,
                    )
                    .command(
                        MessageKey::new(profiles::ALERTME, id::ALERTME_JOIN, commands::join::HELLO_RESPONSE),
                        Route::HelloResponse,
                    )
                    .cluster(profiles::ALERTME, id::ALERTME_BUTTON, Route::Button);
            }
            DeviceKind::IrrigationController => {
                classifier
                    .command(
                        MessageKey::new(
                            profiles::HOME_AUTOMATION,
                            id::POLL_CONTROL,
                            commands::poll_control::CHECK_IN,
                        ),
                        Route::PollCheckIn,
                    )
                    .global(profiles::HOME_AUTOMATION, GlobalCommand::ReportAttributes, Route::ReportAttributes)
                    .global(
                        profiles::HOME_AUTOMATION,
                        GlobalCommand::ReadAttributesResponse,
                        Route::ReadAttributesResponse,
                    )
                    .global(
                        profiles::HOME_AUTOMATION,
                        GlobalCommand::ConfigureReportingResponse,
                        Route::ConfigureReportingResponse,
                    )
                    .global(
                        profiles::HOME_AUTOMATION,
                        GlobalCommand::WriteAttributesResponse,
                        Route::WriteAttributesResponse,
                    )
                    .global(profiles::HOME_AUTOMATION, GlobalCommand::DefaultResponse, Route::DefaultResponse);
            }
        }
        classifier
    }

    fn command(&mut self, key: MessageKey, route: Route) -> &mut Self {
        self.commands.insert(key, route);
        self
    }

    fn cluster(&mut self, profile_id: u16, cluster_id: u16, route: Route) -> &mut Self {
        self.clusters.insert((profile_id, cluster_id), route);
        self
    }

    fn global(&mut self, profile_id: u16, command: GlobalCommand, route: Route) -> &mut Self {
        self.globals.insert((profile_id, command as u8), route);
        self
    }

    /// Classify a frame; unknown identifiers map to [`Route::Unhandled`]
    #[must_use]
    pub fn classify(&self, frame: &InboundFrame) -> Route {
        if !frame.is_cluster_specific() {
            return self
                .globals
                .get(&(frame.profile_id, frame.command_id))
                .copied()
                .unwrap_or(Route::Unhandled);
        }

        let key = MessageKey::new(frame.profile_id, frame.cluster_id, frame.command_id);
        self.commands
            .get(&key)
            .or_else(|| self.clusters.get(&(frame.profile_id, frame.cluster_id)))
            .copied()
            .unwrap_or(Route::Unhandled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_protocol::endpoints;

    fn alertme(cluster: u16, command: u8) -> InboundFrame {
        InboundFrame::cluster_specific(profiles::ALERTME, endpoints::ALERTME, cluster, command, Vec::new())
    }

    #[test]
    fn test_button_routes() {
        let c = Classifier::for_kind(DeviceKind::Button);
        assert_eq!(c.classify(&alertme(id::ALERTME_GENERAL, 0xFB)), Route::Heartbeat);
        assert_eq!(c.classify(&alertme(id::ALERTME_JOIN, 0xFE)), Route::HelloResponse);
        assert_eq!(c.classify(&alertme(0x00F3, 1)), Route::Button);
        assert_eq!(c.classify(&alertme(0x00F3, 0)), Route::Button);
        // Unknown button codes still reach the button handler, which ignores them
        assert_eq!(c.classify(&alertme(0x00F3, 9)), Route::Button);
        assert_eq!(c.classify(&alertme(id::ALERTME_GENERAL, 0x10)), Route::Unhandled);
        assert_eq!(c.classify(&alertme(0x00F2, 0x01)), Route::Unhandled);
    }

    #[test]
    fn test_profile_scoping() {
        let c = Classifier::for_kind(DeviceKind::Button);
        let frame = InboundFrame::cluster_specific(profiles::HOME_AUTOMATION, 1, 0x00F3, 1, Vec::new());
        assert_eq!(c.classify(&frame), Route::Unhandled);

        // Global frames are not modeled for buttons
        let frame = InboundFrame::global(profiles::ALERTME, 2, id::POWER_CONFIG, 0x0A, vec![0; 4]);
        assert_eq!(c.classify(&frame), Route::Unhandled);
    }

    #[test]
    fn test_irrigation_routes() {
        let c = Classifier::for_kind(DeviceKind::IrrigationController);
        let report = InboundFrame::global(profiles::HOME_AUTOMATION, 3, id::ON_OFF, 0x0A, Vec::new());
        assert_eq!(c.classify(&report), Route::ReportAttributes);

        let rsp = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::POWER_CONFIG, 0x07, vec![0]);
        assert_eq!(c.classify(&rsp), Route::ConfigureReportingResponse);

        let rsp = InboundFrame::global(profiles::HOME_AUTOMATION, 1, id::POLL_CONTROL, 0x04, vec![0]);
        assert_eq!(c.classify(&rsp), Route::WriteAttributesResponse);

        let check_in = InboundFrame::cluster_specific(profiles::HOME_AUTOMATION, 1, id::POLL_CONTROL, 0x00, Vec::new());
        assert_eq!(c.classify(&check_in), Route::PollCheckIn);
        assert!(c.classify(&check_in).is_heartbeat());

        // Cluster-specific On/Off commands from the device are not modeled
        let toggle = InboundFrame::cluster_specific(profiles::HOME_AUTOMATION, 1, id::ON_OFF, 0x02, Vec::new());
        assert_eq!(c.classify(&toggle), Route::Unhandled);

        let heartbeat = alertme(id::ALERTME_GENERAL, 0xFB);
        assert_eq!(c.classify(&heartbeat), Route::Unhandled);
    }

    #[test]
    fn test_classification_is_pure() {
        let c = Classifier::for_kind(DeviceKind::Button);
        let frame = alertme(0x00F3, 1);
        let first = c.classify(&frame);
        for _ in 0..3 {
            assert_eq!(c.classify(&frame), first);
        }
    }
}
