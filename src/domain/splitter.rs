//! 文本分块器
//!
//! 将长文本切分为有界的朗读分块：先按句末标点断句，
//! 再贪心累积句子，直到下一句会超过 max_chunk_chars 为止。
//!
//! 纯函数且确定性：相同输入永远产生相同的有序分块列表。
//! 预期分块数依赖该性质按需重算，从不持久化。

/// 默认单个分块的最大字符数
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 2000;

/// 分块配置
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// 单个分块的最大字符数
    pub max_chunk_chars: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }
}

/// 检查是否为句末标点
#[inline]
fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | '。' | '！' | '？')
}

/// 按句末标点 + 空白断句
///
/// 句末标点后跟空白（或文本结尾）才构成句子边界，连续标点
/// （"?!"、"..."）归入同一句。缩写和小数点会被误判为句末，
/// 属于尽力而为的启发式，不是严格契约。
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);

        if !is_terminal(ch) {
            continue;
        }

        // 吸收连续的句末标点
        while let Some(&next) = chars.peek() {
            if is_terminal(next) {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }

        // 仅当标点后是空白或文本结尾时断句
        let at_boundary = match chars.peek() {
            Some(&next) => next.is_whitespace(),
            None => true,
        };

        if at_boundary {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    // 剩余内容作为尾句
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// 将文本切分为有界分块
///
/// 贪心策略：持续向当前分块追加句子，直到再加一句就会超过
/// max_chunk_chars，此时封闭当前分块并开启新分块；
/// 末尾的不完整分块照常输出。
///
/// 单句超长时整句输出（绝不从词中间截断），这是唯一允许
/// 分块超过 max_chunk_chars 的情况。
pub fn split_chunks(text: &str, config: &SplitConfig) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();

        // 加上连接空格后会超限则封闭当前分块
        if current_chars > 0 && current_chars + 1 + sentence_chars > config.max_chunk_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if current_chars > 0 {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(&sentence);
        current_chars += sentence_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// 使用默认配置分块（便捷方法）
pub fn split_chunks_default(text: &str) -> Vec<String> {
    split_chunks(text, &SplitConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// 构造恰好 100 字符的句子（含句号）
    fn make_sentence(i: usize) -> String {
        let mut s = format!("Sentence number {:02} keeps the narration moving along", i);
        while s.chars().count() < 99 {
            s.push_str(" on");
        }
        s.truncate(99);
        s.push('.');
        assert_eq!(s.chars().count(), 100);
        s
    }

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("First one. Second one! Third one?");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "First one.");
        assert_eq!(sentences[1], "Second one!");
        assert_eq!(sentences[2], "Third one?");
    }

    #[test]
    fn test_split_sentences_consecutive_punctuation() {
        let sentences = split_sentences("Really?! Yes... Sure.");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "Really?!");
        assert_eq!(sentences[1], "Yes...");
    }

    #[test]
    fn test_split_sentences_requires_whitespace_after_terminal() {
        // 小数点后无空白，不断句
        let sentences = split_sentences("Pi is 3.14 roughly. Next sentence.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "Pi is 3.14 roughly.");
    }

    #[test]
    fn test_split_sentences_trailing_partial() {
        let sentences = split_sentences("Complete sentence. trailing fragment without punctuation");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1], "trailing fragment without punctuation");
    }

    #[test]
    fn test_determinism() {
        let text = "One. Two. Three! Four? Five.";
        let config = SplitConfig { max_chunk_chars: 12 };
        let a = split_chunks(text, &config);
        let b = split_chunks(text, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_size_bound_respected() {
        let text: String = (0..30).map(make_sentence).collect::<Vec<_>>().join(" ");
        let config = SplitConfig { max_chunk_chars: 350 };
        for chunk in split_chunks(&text, &config) {
            assert!(chunk.chars().count() <= 350, "chunk exceeded bound: {}", chunk.len());
        }
    }

    #[test]
    fn test_oversize_sentence_emitted_whole() {
        let long = format!("{}.", "word ".repeat(100).trim_end());
        let text = format!("Short lead. {} Short tail.", long);
        let config = SplitConfig { max_chunk_chars: 50 };
        let chunks = split_chunks(&text, &config);

        // 超长单句整句输出，不从词中间截断
        assert!(chunks.iter().any(|c| c == &long));
        for chunk in &chunks {
            if chunk != &long {
                assert!(chunk.chars().count() <= 50);
            }
        }
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(split_chunks_default("").is_empty());
        assert!(split_chunks_default("   \n\t  ").is_empty());
    }

    #[test]
    fn test_five_thousand_chars_three_chunks() {
        // 50 句 × 100 字符，空格连接，M = 2000
        let sentences: Vec<String> = (0..50).map(make_sentence).collect();
        let text = sentences.join(" ");
        let config = SplitConfig { max_chunk_chars: 2000 };
        let chunks = split_chunks(&text, &config);

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 2000);
        }

        // 拼接结果除空白外还原原文
        let joined = chunks.join(" ");
        assert_eq!(strip_whitespace(&joined), strip_whitespace(&text));
    }

    #[test]
    fn test_cjk_terminal_punctuation() {
        let sentences = split_sentences("第一句。 第二句！ 第三句？");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "第一句。");
    }
}
