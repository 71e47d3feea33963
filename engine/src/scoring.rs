/// Age-proximity score used by both halves of `MatchingEngine::search`'s composite
/// score. Returns 5 when `age` falls inside `[lo, hi]`, decays linearly (integer
/// division, truncating toward zero) out to a distance of 15, and is 0 beyond that.
///
/// This is the distance-cutoff variant; a sibling implementation found in the
/// original sources returns `diff % 5` instead, which cycles back up to 4 as the
/// distance grows past 5 and is almost certainly a bug rather than a deliberate
/// design. Not adopted here.
pub(crate) fn age_score(age: i32, lo: i32, hi: i32) -> i32 {
    if age >= lo && age <= hi {
        return 5;
    }
    let d = if age < lo { lo - age } else { age - hi };
    if d > 15 {
        0
    } else {
        (5 - d / 3).max(0)
    }
}
