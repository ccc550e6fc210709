use std::future::Future;

/// Result of minimising a failing input's string fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkResult {
    pub fields: Vec<String>,
    pub attempts: usize,
    /// `should_stop` ended the pass before the budget or the input ran out.
    pub stopped: bool,
}

fn char_len(fields: &[String]) -> usize {
    fields.iter().map(|f| f.chars().count()).sum()
}

pub fn total_length(fields: &[String]) -> usize {
    char_len(fields)
}

/// Remove ever-smaller chunks from each field in turn, keeping a candidate
/// only when `reproduces` confirms it still fails the same way. Every kept
/// candidate is strictly shorter than the previous one, and at most
/// `max_attempts` re-executions are spent. `should_stop` is consulted
/// before every attempt.
pub async fn minimize<F, Fut, S>(
    fields: Vec<String>,
    min_field_length: usize,
    max_attempts: usize,
    mut should_stop: S,
    mut reproduces: F,
) -> ShrinkResult
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = bool>,
    S: FnMut() -> bool,
{
    let mut current = fields;
    let mut attempts = 0;
    let mut stopped = false;

    'fields: for index in 0..current.len() {
        let mut chunk = current[index].chars().count();
        while chunk > 0 {
            let chars: Vec<char> = current[index].chars().collect();
            if chars.len() <= min_field_length {
                break;
            }
            let mut reduced = false;
            let mut start = 0;
            while start < chars.len() {
                let end = (start + chunk).min(chars.len());
                let remaining = chars.len() - (end - start);
                if remaining >= min_field_length {
                    if attempts >= max_attempts {
                        break 'fields;
                    }
                    if should_stop() {
                        stopped = true;
                        break 'fields;
                    }
                    attempts += 1;
                    let candidate: String = chars[..start].iter().chain(&chars[end..]).collect();
                    let mut trial = current.clone();
                    trial[index] = candidate;
                    if reproduces(trial.clone()).await {
                        current = trial;
                        reduced = true;
                        break;
                    }
                }
                start += chunk;
            }
            if !reduced {
                chunk /= 2;
            }
            chunk = chunk.min(current[index].chars().count());
        }
    }

    ShrinkResult { fields: current, attempts, stopped }
}
