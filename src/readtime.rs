// readtime.rs

/// 読了速度 (1分あたりの単語数)
const WORDS_PER_MINUTE: usize = 200;

/// 本文から読了時間 (分) を見積もる。
/// 空白区切りの単語数を 200 wpm で割って切り上げる。
/// ラベルに "0 min read" を出さないため、空文も含めて最低 1 分とする。
pub fn estimate_minutes(body: &str) -> usize {
    let words = body.split_whitespace().count();
    let minutes = (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
    minutes.max(1)
}

/// 表示用ラベル ("2 min read")
pub fn read_time_label(body: &str) -> String {
    format!("{} min read", estimate_minutes(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn four_hundred_words_is_two_minutes() {
        assert_eq!(estimate_minutes(&words(400)), 2);
        assert_eq!(read_time_label(&words(400)), "2 min read");
    }

    #[test]
    fn one_word_rounds_up_to_one_minute() {
        assert_eq!(read_time_label("hello"), "1 min read");
    }

    #[test]
    fn partial_minute_rounds_up() {
        assert_eq!(estimate_minutes(&words(201)), 2);
        assert_eq!(estimate_minutes(&words(200)), 1);
    }

    #[test]
    fn empty_body_is_floored_at_one_minute() {
        // "0 min read" は表示しない
        assert_eq!(read_time_label(""), "1 min read");
        assert_eq!(read_time_label("   \n\t "), "1 min read");
    }
}
