//! Static pipette specifications.
//!
//! Resolves a logical pipette name to its concrete hardware
//! configuration: channel count, volume range, default flow rates, and
//! tip-overlap table. The equipment handler consults these tables when
//! loading a pipette or reconfiguring it for a working volume.

use std::collections::BTreeMap;

use aria_common::entities::{StaticPipetteConfig, TipGeometry};
use aria_common::types::PipetteName;

struct PipetteSpec {
    model: &'static str,
    display_name: &'static str,
    channels: u8,
    min_volume: f64,
    max_volume: f64,
    flow_rate: f64,
    tip_length: f64,
    tip_diameter: f64,
}

const fn spec_for(name: PipetteName) -> PipetteSpec {
    match name {
        PipetteName::P20SingleGen2 => PipetteSpec {
            model: "p20_single_v2.2",
            display_name: "P20 Single-Channel GEN2",
            channels: 1,
            min_volume: 1.0,
            max_volume: 20.0,
            flow_rate: 7.56,
            tip_length: 39.2,
            tip_diameter: 3.2,
        },
        PipetteName::P300SingleGen2 => PipetteSpec {
            model: "p300_single_v2.1",
            display_name: "P300 Single-Channel GEN2",
            channels: 1,
            min_volume: 20.0,
            max_volume: 300.0,
            flow_rate: 46.43,
            tip_length: 51.0,
            tip_diameter: 5.2,
        },
        PipetteName::P300MultiGen2 => PipetteSpec {
            model: "p300_multi_v2.1",
            display_name: "P300 8-Channel GEN2",
            channels: 8,
            min_volume: 20.0,
            max_volume: 300.0,
            flow_rate: 46.43,
            tip_length: 51.0,
            tip_diameter: 5.2,
        },
        PipetteName::P1000SingleGen2 => PipetteSpec {
            model: "p1000_single_v2.2",
            display_name: "P1000 Single-Channel GEN2",
            channels: 1,
            min_volume: 100.0,
            max_volume: 1000.0,
            flow_rate: 137.35,
            tip_length: 78.3,
            tip_diameter: 7.2,
        },
        PipetteName::P50SingleFlex => PipetteSpec {
            model: "p50_single_v3.5",
            display_name: "Flex 1-Channel 50 uL",
            channels: 1,
            min_volume: 5.0,
            max_volume: 50.0,
            flow_rate: 8.0,
            tip_length: 47.9,
            tip_diameter: 3.9,
        },
        PipetteName::P50MultiFlex => PipetteSpec {
            model: "p50_multi_v3.5",
            display_name: "Flex 8-Channel 50 uL",
            channels: 8,
            min_volume: 5.0,
            max_volume: 50.0,
            flow_rate: 8.0,
            tip_length: 47.9,
            tip_diameter: 3.9,
        },
        PipetteName::P1000SingleFlex => PipetteSpec {
            model: "p1000_single_v3.5",
            display_name: "Flex 1-Channel 1000 uL",
            channels: 1,
            min_volume: 5.0,
            max_volume: 1000.0,
            flow_rate: 160.0,
            tip_length: 85.4,
            tip_diameter: 7.8,
        },
        PipetteName::P1000MultiFlex => PipetteSpec {
            model: "p1000_multi_v3.5",
            display_name: "Flex 8-Channel 1000 uL",
            channels: 8,
            min_volume: 5.0,
            max_volume: 1000.0,
            flow_rate: 160.0,
            tip_length: 85.4,
            tip_diameter: 7.8,
        },
        PipetteName::P1000NinetySix => PipetteSpec {
            model: "p1000_96_v3.5",
            display_name: "Flex 96-Channel 1000 uL",
            channels: 96,
            min_volume: 5.0,
            max_volume: 1000.0,
            flow_rate: 160.0,
            tip_length: 85.4,
            tip_diameter: 7.8,
        },
    }
}

/// Concrete hardware configuration for a pipette model.
pub fn static_config(name: PipetteName) -> StaticPipetteConfig {
    let spec = spec_for(name);
    let mut nominal_tip_overlap = BTreeMap::new();
    nominal_tip_overlap.insert("default".to_owned(), 10.5);
    StaticPipetteConfig {
        model: spec.model.to_owned(),
        display_name: spec.display_name.to_owned(),
        channels: spec.channels,
        min_volume: spec.min_volume,
        max_volume: spec.max_volume,
        default_aspirate_flow_rate: spec.flow_rate,
        default_dispense_flow_rate: spec.flow_rate,
        default_blow_out_flow_rate: spec.flow_rate,
        nominal_tip_overlap,
    }
}

/// Configuration after reconfiguring for a working volume. Low-volume
/// capable models switch to a mode with a lower minimum.
pub fn static_config_for_volume(name: PipetteName, volume: f64) -> StaticPipetteConfig {
    let mut config = static_config(name);
    let low_volume_capable = matches!(
        name,
        PipetteName::P50SingleFlex | PipetteName::P50MultiFlex
    );
    if low_volume_capable && volume < config.min_volume {
        config.model.push_str("_lowVolume");
        config.min_volume = 1.0;
        config.max_volume = 30.0;
    }
    config
}

/// Nominal geometry of the tips this pipette picks up.
pub fn tip_geometry(name: PipetteName) -> TipGeometry {
    let spec = spec_for(name);
    TipGeometry {
        length: spec.tip_length,
        diameter: spec.tip_diameter,
        volume: spec.max_volume,
    }
}
