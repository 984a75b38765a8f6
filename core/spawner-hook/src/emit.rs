//! `spawner-hook emit <kind> <json>`: marker text for agents that shell out.

use spawner_core::emit;

pub fn run(kind: &str, data: &str) -> Result<(), String> {
    println!("{}", marker(kind, data)?);
    Ok(())
}

fn marker(kind: &str, data: &str) -> Result<String, String> {
    let data: serde_json::Value =
        serde_json::from_str(data).map_err(|e| format!("Invalid event JSON: {}", e))?;
    let event = emit::build(kind, data)?;
    Ok(emit::to_marker(&event)?)
}
