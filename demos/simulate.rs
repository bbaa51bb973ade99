//! Simulate a calm → shaking → calm recording and print every engine event

use imu_risk::{evaluate_samples, EngineConfig, Sample};

fn main() {
    let samples: Vec<Sample> = (0..1_400)
        .map(|i| {
            let t = i as i64 * 40;
            if (350..700).contains(&i) {
                let z = [5.0, 30.0, 10.0][i % 3];
                Sample::new(t, 0.4, -0.2, z)
            } else {
                Sample::new(t, 0.0, 0.0, 9.8)
            }
        })
        .collect();

    match evaluate_samples(EngineConfig::default(), &samples) {
        Ok(events) => {
            for event in events {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
        }
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
