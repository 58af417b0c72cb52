use std::path::Path;

use carelog_core::sync::SyncMappingStore;

use crate::commands::common::{
    format_mapping_lines, mapping_to_item, open_database, parse_entity_type, MappingItem,
};
use crate::error::CliError;

pub async fn run_mappings(entity_type: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let entity_type = parse_entity_type(entity_type)?;
    let db = open_database(db_path).await?;
    let mappings = db.get_all_by_type(entity_type).await?;

    if as_json {
        let json_items = mappings
            .iter()
            .map(mapping_to_item)
            .collect::<Vec<MappingItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if mappings.is_empty() {
        println!("No {} have been synced yet.", entity_type.display_name().to_lowercase());
        return Ok(());
    }

    for line in format_mapping_lines(&mappings) {
        println!("{line}");
    }
    Ok(())
}
