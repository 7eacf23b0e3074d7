use crate::Engine;

pub fn collect_keys(engine: &Engine, descending: bool) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    engine.keys(descending, |k| out.push(k.to_vec()));
    out
}

pub fn collect_matches(engine: &Engine, pattern: &[u8], segment: Option<usize>) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    engine.search(pattern, segment, |k| out.push(k.to_vec()));
    out
}
