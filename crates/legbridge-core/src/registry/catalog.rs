//! Stock command catalog of the hexapod controller board

use super::{CommandDefinition, CommandRegistry, Conversion, Decoder, ParamSpec};

/// Command registers understood by the board firmware
#[allow(missing_docs)]
pub mod register {
    pub const POWER: u8 = 5;
    pub const SPEED: u8 = 10;
    pub const GAIT_MODE: u8 = 15;
    pub const BALANCE_MODE: u8 = 20;
    pub const BODY_HEIGHT: u8 = 25;
    pub const TRANSLATE: u8 = 35;
    pub const WALK: u8 = 40;
    pub const ROTATE: u8 = 45;
    pub const DOUBLE_HEIGHT: u8 = 50;
    pub const DOUBLE_LENGTH: u8 = 55;
    pub const SINGLE_LEG_POS: u8 = 60;
    pub const SOUND: u8 = 65;
    pub const OUT: u8 = 70;
    pub const STATUS_LED: u8 = 75;

    pub const SELECT_LEG: u8 = 100;
    pub const BATTERY: u8 = 105;
    pub const PS2_ACTIVE: u8 = 110;
    pub const IS_WALKING: u8 = 115;
    pub const IS_POWER_ON: u8 = 120;
    pub const READ_PS2_VALUES: u8 = 125;
    pub const IN1: u8 = 130;

    pub const RESET: u8 = 255;
}

/// Joystick centre for the walk register
const CENTER: u8 = 128;

/// Build the registry for the stock firmware
pub fn standard() -> CommandRegistry {
    use register::*;

    CommandRegistry::new()
        .with("reset", CommandDefinition::fixed(&[RESET, 100, 100, 100]))
        .with("power_on", CommandDefinition::fixed(&[POWER, 1]))
        .with("power_off", CommandDefinition::fixed(&[POWER, 0]))
        .with("balance_on", CommandDefinition::fixed(&[BALANCE_MODE, 1]))
        .with("balance_off", CommandDefinition::fixed(&[BALANCE_MODE, 0]))
        // walk presets: side, forward (0 is full ahead), turn
        .with("walk_stop", CommandDefinition::fixed(&[WALK, CENTER, CENTER, CENTER]))
        .with("walk_forward", CommandDefinition::fixed(&[WALK, CENTER, 0, CENTER]))
        .with("walk_back", CommandDefinition::fixed(&[WALK, CENTER, 255, CENTER]))
        .with("walk_left", CommandDefinition::fixed(&[WALK, 0, CENTER, CENTER]))
        .with("walk_right", CommandDefinition::fixed(&[WALK, 255, CENTER, CENTER]))
        .with("walk_turn_left", CommandDefinition::fixed(&[WALK, CENTER, CENTER, 0]))
        .with("walk_turn_right", CommandDefinition::fixed(&[WALK, CENTER, CENTER, 255]))
        .with(
            "sound",
            CommandDefinition::parameterized(
                SOUND,
                vec![
                    ParamSpec::new("duration", Conversion::Byte),
                    ParamSpec::new("frequency", Conversion::range(0, 2550, 0, 255)),
                ],
            ),
        )
        .with(
            "body_height",
            CommandDefinition::parameterized(
                BODY_HEIGHT,
                vec![ParamSpec::new("height", Conversion::percent(0, 130))],
            ),
        )
        .with(
            "speed",
            CommandDefinition::parameterized(
                SPEED,
                vec![ParamSpec::new("speed", Conversion::percent(100, 0))],
            ),
        )
        .with(
            "gait_mode",
            CommandDefinition::parameterized(GAIT_MODE, vec![ParamSpec::new("mode", Conversion::Byte)]),
        )
        .with(
            "walk",
            CommandDefinition::parameterized(
                WALK,
                vec![
                    ParamSpec::new("side", Conversion::range(-100, 100, 1, 255)),
                    ParamSpec::new("forward", Conversion::range(-100, 100, 255, 1)),
                    ParamSpec::new("turn", Conversion::range(-100, 100, 1, 255)),
                ],
            ),
        )
        .with(
            "akku_charge",
            CommandDefinition::fixed(&[BATTERY]).with_decoder(Decoder::ChargeLevel),
        )
        .with(
            "is_walking",
            CommandDefinition::fixed(&[IS_WALKING]).with_decoder(Decoder::Flag),
        )
        .with(
            "is_power_on",
            CommandDefinition::fixed(&[IS_POWER_ON]).with_decoder(Decoder::Flag),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(name: &str, pairs: &[(&str, &str)]) -> [u8; 9] {
        let params: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        *standard()
            .get(name)
            .unwrap_or_else(|| panic!("{name} missing"))
            .resolve(&params)
            .unwrap()
            .as_bytes()
    }

    #[test]
    fn test_body_height_sixty_percent() {
        let b = resolve("body_height", &[("height", "60")]);
        assert_eq!(b[3], register::BODY_HEIGHT);
        assert_eq!(&b[4..8], &[78, 0, 0, 0]);
    }

    #[test]
    fn test_walk_full_forward() {
        let b = resolve("walk", &[("side", "0"), ("forward", "100"), ("turn", "0")]);
        assert_eq!(&b[3..8], &[register::WALK, 128, 1, 128, 0]);
    }

    #[test]
    fn test_reset_payload() {
        let b = resolve("reset", &[]);
        assert_eq!(&b[3..8], &[255, 100, 100, 100, 0]);
    }

    #[test]
    fn test_queries_have_decoders() {
        let registry = standard();
        assert_eq!(registry.get("akku_charge").unwrap().decoder, Decoder::ChargeLevel);
        assert_eq!(registry.get("is_power_on").unwrap().decoder, Decoder::Flag);
        assert_eq!(registry.get("power_on").unwrap().decoder, Decoder::Ack);
    }

    #[test]
    fn test_names_unique_and_sorted() {
        let registry = standard();
        let names: Vec<&str> = registry.iter().map(|(n, _)| n).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 20);
    }
}
