//! Hardware check sequence: reset, beep, power up, raise the body, walk a
//! few steps, stop and power down.

use std::collections::HashMap;
use std::time::Duration;

use legbridge_core::protocol::Gateway;
use tracing::info;

/// Command, parameters, pause afterwards
const STEPS: &[(&str, &[(&str, &str)], u64)] = &[
    ("reset", &[], 1500),
    ("sound", &[("duration", "20"), ("frequency", "1000")], 0),
    ("power_on", &[], 2000),
    ("body_height", &[("height", "60")], 3000),
    ("walk_forward", &[], 5000),
    ("walk_stop", &[], 2000),
    ("akku_charge", &[], 0),
    ("power_off", &[], 0),
];

pub async fn run(gateway: &Gateway) {
    for (name, params, pause_ms) in STEPS {
        let params: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let answer = gateway.invoke(name, params).await;
        info!(command = *name, %answer, "demo step");
        println!("{name}: {answer}");
        if *pause_ms > 0 {
            tokio::time::sleep(Duration::from_millis(*pause_ms)).await;
        }
    }
}
