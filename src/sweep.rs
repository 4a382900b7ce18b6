/// Next spot count to probe after `spots` at `stride`.
///
/// Doubles while the working set is at most `step` words, then grows by `step / stride`
/// spots, or by a single spot once the stride alone is larger than `step`.
pub fn next_spot_count(stride: u64, spots: u64, step: u64) -> u64 {
    if spots * stride <= step {
        spots * 2
    } else if stride > step {
        spots + 1
    } else {
        spots + step / stride
    }
}

/// All spot counts the capacity sweep visits at `stride`, from 1 up to one step past
/// `max_words / stride`
pub fn make_spots(stride: u64, max_words: u64, step: u64) -> Vec<u64> {
    let max_spots = next_spot_count(stride, max_words / stride, step);
    let mut result = Vec::new();
    let mut spots = 1;
    while spots <= max_spots {
        result.push(spots);
        spots = next_spot_count(stride, spots, step);
    }
    result
}
