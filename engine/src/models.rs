use std::collections::HashSet;

/// A participant registered for matching.
///
/// `your_sex` and `my_sex` are raw `{0, 1, 2}` codes rather than an enum: the engine
/// never interprets their meaning beyond "equal or 2 means any", and the caller
/// (who owns the actual sex taxonomy) is contracted to only ever pass 0, 1, or 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: u64,
    pub language: String,
    pub your_start: i32,
    pub your_end: i32,
    pub your_sex: u8,
    pub my_age: i32,
    pub my_sex: u8,
    pub priority: bool,
    pub interests: HashSet<String>,
}

impl Participant {
    pub(crate) fn bucket_key(&self) -> (String, u8) {
        (self.language.clone(), self.my_sex)
    }
}
