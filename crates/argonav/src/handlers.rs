//
// handlers.rs
//
// Turn navigation results into LSP responses
//

use tower_lsp::lsp_types::{GotoDefinitionResponse, Location, Position, Range, Url};

use crate::navigator::Resolution;
use crate::types::SearchResult;

/// LSP locations for a search result, in result order
pub fn locations(result: &SearchResult) -> Vec<Location> {
    result
        .locations
        .iter()
        .filter_map(|loc| {
            let location = loc.to_lsp_location();
            if location.is_none() {
                log::trace!("Dropping location with non-absolute path: {}", loc.file.display());
            }
            location
        })
        .collect()
}

pub fn goto_definition(resolution: &Resolution) -> Option<GotoDefinitionResponse> {
    let mut locations = locations(&resolution.result);
    match locations.len() {
        0 => None,
        1 => locations.pop().map(GotoDefinitionResponse::Scalar),
        _ => Some(GotoDefinitionResponse::Array(locations)),
    }
}

/// Reference locations. On a definition site with `include_declaration`,
/// the cursor line of the requesting document comes first.
pub fn references(
    resolution: &Resolution,
    uri: &Url,
    position: Position,
    include_declaration: bool,
) -> Vec<Location> {
    let mut found = Vec::with_capacity(resolution.result.len() + 1);
    if include_declaration && resolution.is_definition_site() {
        let start = Position::new(position.line, 0);
        found.push(Location::new(uri.clone(), Range::new(start, start)));
    }
    found.extend(locations(&resolution.result));
    found
}
