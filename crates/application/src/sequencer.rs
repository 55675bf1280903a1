use std::sync::Mutex;

use domain::Timestamp;
use rand::Rng;

/// 推送键字符表，按 ASCII 顺序排列，保证键的字典序与生成顺序一致
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

#[derive(Debug)]
struct SequencerState {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
}

/// 推送键生成器
///
/// 20 个字符：前 8 位编码毫秒时间，后 12 位随机。同一毫秒内（或时钟回拨时）
/// 沿用上一次的时间并把随机部分加一，因此同一进程内生成的键严格递增，
/// 可以直接作为消息的创建序号。
#[derive(Debug)]
pub struct PushKeySequencer {
    state: Mutex<SequencerState>,
}

impl Default for PushKeySequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PushKeySequencer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SequencerState {
                last_millis: i64::MIN,
                last_random: [0; RANDOM_CHARS],
            }),
        }
    }

    /// 为 `now` 时刻分配一个新键
    pub fn next_key(&self, now: Timestamp) -> String {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let millis = now.timestamp_millis().max(0);

        if millis > state.last_millis {
            state.last_millis = millis;
            let mut rng = rand::rng();
            for digit in state.last_random.iter_mut() {
                *digit = rng.random_range(0..64);
            }
        } else if !increment(&mut state.last_random) {
            // 随机部分溢出，借用下一毫秒
            state.last_millis += 1;
            state.last_random = [0; RANDOM_CHARS];
        }

        let mut key = Vec::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut remaining = state.last_millis;
        let mut time_part = [0u8; TIME_CHARS];
        for slot in time_part.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }
        key.extend_from_slice(&time_part);
        key.extend(state.last_random.iter().map(|d| PUSH_CHARS[*d as usize]));

        // PUSH_CHARS 全是 ASCII
        String::from_utf8_lossy(&key).into_owned()
    }
}

/// 按 64 进制给随机部分加一，全部进位时返回 `false`
fn increment(digits: &mut [u8; RANDOM_CHARS]) -> bool {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return true;
        }
    }
    false
}
