/// Automatic "loading complete" formula.
///
/// An unset target never completes a row, and a row with nothing loaded is
/// never complete even against a zero target. Timestamps play no part.
pub fn auto_complete(loaded_count: u32, target_count: Option<u32>) -> bool {
    match target_count {
        Some(target) => loaded_count >= target && loaded_count > 0,
        None => false,
    }
}
