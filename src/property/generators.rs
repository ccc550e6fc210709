use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Number, Value};

use crate::models::{HttpMethod, FUZZ_METHODS};

pub const MAX_NAME_LENGTH: usize = 5_000;
pub const MAX_DESC_LENGTH: usize = 10_000;
pub const MAX_QUERY_LENGTH: usize = 2_000;
pub const MAX_PATH_SUFFIX_LENGTH: usize = 200;
pub const MAX_JSON_LEAVES: usize = 20;
pub const MAX_JSON_CHILDREN: usize = 5;
pub const MAX_JSON_DEPTH: usize = 6;
pub const MAX_JSON_STRING_LENGTH: usize = 100;
pub const MAX_JSON_KEY_LENGTH: usize = 20;

const PATH_PUNCTUATION: &[char] = &['-', '_', '/', '.'];
const NON_ASCII_ALNUM: &[char] = &['é', 'ß', 'Ж', 'λ', '中', '文', 'ア', '٣', '७', 'Ⅻ'];
const AWKWARD: &[char] = &[
    '\0', '\t', '\n', '\r', '\u{7f}', '\'', '"', '\\', '<', '>', '&', '%', '{', '}', '$', ';',
    '\u{200b}', '\u{202e}', '\u{feff}', '\u{fffd}',
];

/// Bounded random inputs for property trials. Seeded so a run can be
/// replayed exactly.
pub struct TrialGenerator {
    rng: StdRng,
}

impl TrialGenerator {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Length biased toward short values while still reaching `max`.
    fn length(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let cap = match self.rng.gen_range(0..10) {
            0..=4 => (min + 16).min(max),
            5..=7 => (min + (max - min) / 10).max(min + 1).min(max),
            _ => max,
        };
        self.rng.gen_range(min..=cap)
    }

    fn any_char(&mut self) -> char {
        match self.rng.gen_range(0..10) {
            0..=4 => self.rng.gen_range(' '..='~'),
            5 | 6 => AWKWARD[self.rng.gen_range(0..AWKWARD.len())],
            7 => self.rng.gen_range('\u{a0}'..='\u{2fff}'),
            8 => self.rng.gen_range('\u{4e00}'..='\u{9fff}'),
            _ => self.rng.gen_range('\u{1f300}'..='\u{1faff}'),
        }
    }

    /// Arbitrary Unicode text of 0..=`max_len` characters.
    pub fn text(&mut self, max_len: usize) -> String {
        let len = self.length(0, max_len);
        (0..len).map(|_| self.any_char()).collect()
    }

    /// 1..=200 characters of letters, digits and `-_/.`.
    pub fn path_suffix(&mut self) -> String {
        let len = self.length(1, MAX_PATH_SUFFIX_LENGTH);
        (0..len)
            .map(|_| match self.rng.gen_range(0..10) {
                0..=3 => self.rng.gen_range('a'..='z'),
                4 => self.rng.gen_range('A'..='Z'),
                5 | 6 => self.rng.gen_range('0'..='9'),
                7 => NON_ASCII_ALNUM[self.rng.gen_range(0..NON_ASCII_ALNUM.len())],
                _ => PATH_PUNCTUATION[self.rng.gen_range(0..PATH_PUNCTUATION.len())],
            })
            .collect()
    }

    pub fn method(&mut self) -> HttpMethod {
        FUZZ_METHODS[self.rng.gen_range(0..FUZZ_METHODS.len())]
    }

    /// Recursive JSON document with at most [`MAX_JSON_LEAVES`] scalar leaves.
    pub fn json_tree(&mut self) -> Value {
        let mut budget = MAX_JSON_LEAVES;
        self.json_node(&mut budget, 0)
    }

    fn json_node(&mut self, budget: &mut usize, depth: usize) -> Value {
        if *budget <= 1 || depth >= MAX_JSON_DEPTH || self.rng.gen_bool(0.4) {
            return self.json_leaf(budget);
        }
        let children = self.rng.gen_range(0..=MAX_JSON_CHILDREN);
        if self.rng.gen_bool(0.5) {
            let mut items = Vec::with_capacity(children);
            for _ in 0..children {
                if *budget == 0 {
                    break;
                }
                items.push(self.json_node(budget, depth + 1));
            }
            Value::Array(items)
        } else {
            let mut map = Map::new();
            for _ in 0..children {
                if *budget == 0 {
                    break;
                }
                let key = self.text(MAX_JSON_KEY_LENGTH);
                let value = self.json_node(budget, depth + 1);
                map.insert(key, value);
            }
            Value::Object(map)
        }
    }

    fn json_leaf(&mut self, budget: &mut usize) -> Value {
        *budget = budget.saturating_sub(1);
        match self.rng.gen_range(0..5) {
            0 => Value::Null,
            1 => Value::Bool(self.rng.gen_bool(0.5)),
            2 => Value::Number(self.rng.gen::<i64>().into()),
            3 => {
                let magnitude = 10f64.powi(self.rng.gen_range(-6..=15));
                let float = (self.rng.gen::<f64>() - 0.5) * magnitude;
                Number::from_f64(float).map(Value::Number).unwrap_or(Value::Null)
            }
            _ => Value::String(self.text(MAX_JSON_STRING_LENGTH)),
        }
    }
}

/// Scalar leaves in a JSON document.
pub fn count_leaves(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.iter().map(count_leaves).sum(),
        Value::Object(map) => map.values().map(count_leaves).sum(),
        _ => 1,
    }
}
