use super::{json_pretty, EXIT_SUCCESS};
use nbstack_schema::list_presets;

pub fn run(json: bool) -> Result<u8, String> {
    let presets = list_presets();
    if json {
        let payload: Vec<_> = presets
            .iter()
            .map(|p| serde_json::json!({ "name": p.name, "description": p.description }))
            .collect();
        println!("{}", json_pretty(&payload)?);
    } else {
        let width = presets.iter().map(|p| p.name.len()).max().unwrap_or(0);
        for preset in presets {
            println!("{:width$}  {}", preset.name, preset.description);
        }
    }
    Ok(EXIT_SUCCESS)
}
