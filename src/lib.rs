pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod ir;
pub mod printer;
pub mod replace;

use std::collections::BTreeMap;
use std::path::Path;

use diagnostics::FuserError;
use dispatch::OptOutMutator;
use ir::{Fusion, StatementKind};

/// Read a fusion from its JSON serialisation and check it is well formed.
pub fn load_fusion(path: &Path) -> Result<Fusion, FuserError> {
    let content = std::fs::read_to_string(path).map_err(|e| FuserError::io(path.to_path_buf(), e))?;
    let fusion: Fusion =
        serde_json::from_str(&content).map_err(|source| FuserError::Fusion { path: path.to_path_buf(), source })?;
    fusion
        .validate()
        .map_err(|source| FuserError::InvalidFusion { path: path.to_path_buf(), source })?;
    Ok(fusion)
}

/// Load a fusion file and render it with the IR printer.
pub fn print_file(path: &Path, settings: &config::Settings) -> Result<String, FuserError> {
    let fusion = load_fusion(path)?;
    Ok(printer::print_fusion(&fusion, &settings.printer)?)
}

/// Validate `fusion`, run the identity rewrite over a copy and verify
/// nothing changed. Returns the kind census on success.
pub fn check_fusion(fusion: &Fusion) -> Result<BTreeMap<StatementKind, usize>, FuserError> {
    struct Identity;
    impl OptOutMutator for Identity {}

    fusion.validate()?;
    let mut rewritten = fusion.clone();
    Identity.mutate_fusion(&mut rewritten)?;
    if rewritten.len() != fusion.len() {
        return Err(FuserError::RoundTrip {
            detail: format!("{} statements became {}", fusion.len(), rewritten.len()),
        });
    }
    if rewritten.exprs() != fusion.exprs() {
        return Err(FuserError::RoundTrip { detail: "expr order differs".to_string() });
    }
    if rewritten != *fusion {
        return Err(FuserError::RoundTrip { detail: "statement contents differ".to_string() });
    }
    Ok(dispatch::composers::count_kinds(fusion)?)
}

/// Format a census as `Kind: count` lines in kind order.
pub fn format_census(census: &BTreeMap<StatementKind, usize>) -> String {
    census.iter().map(|(kind, n)| format!("{kind}: {n}\n")).collect()
}
