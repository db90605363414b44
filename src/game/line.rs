/// Slides one line towards index 0: compact, merge each adjacent equal pair
/// once, pad with empty cells. `0` is an empty cell.
///
/// Returns the new line and the points gained from merges. Two tiles of
/// `1 << 31` never merge since their sum does not fit a cell.
pub fn slide_line(line: &[u32]) -> (Vec<u32>, u64) {
    let mut packed: Vec<u32> = Vec::with_capacity(line.len());
    let mut gained = 0u64;
    // A merged tile is consumed and cannot merge again during this slide.
    let mut last_consumed = true;

    for &value in line.iter().filter(|&&v| v != 0) {
        // The largest representable tile stays put.
        let merged = match packed.last() {
            Some(&last) if !last_consumed && last == value => last.checked_mul(2),
            _ => None,
        };
        match merged {
            Some(merged) => {
                if let Some(last) = packed.last_mut() {
                    *last = merged;
                }
                gained += u64::from(merged);
                last_consumed = true;
            }
            None => {
                packed.push(value);
                last_consumed = false;
            }
        }
    }

    packed.resize(line.len(), 0);
    (packed, gained)
}
