//! テキスト正規化 (NFKC・ダッシュ統一・空白圧縮)

use unicode_normalization::UnicodeNormalization;

/// セル文字列を正規化
///
/// - NFKC正規化 (全角英数字・全角記号・㎡などの合成文字を展開)
/// - 各種ダッシュ/マイナス記号を `-` に統一
/// - 連続する空白 (全角スペース含む) を1つに圧縮し、前後を除去
pub fn normalize_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.nfkc() {
        if c.is_whitespace() {
            pending_space = !result.is_empty();
            continue;
        }

        if pending_space {
            result.push(' ');
            pending_space = false;
        }

        result.push(unify_dash(c));
    }

    result
}

/// ダッシュ類を ASCII ハイフンに寄せる
///
/// 長音記号 (ー) はカタカナ語の一部なので対象外。
fn unify_dash(c: char) -> char {
    match c {
        '\u{2010}'..='\u{2015}' | '\u{2043}' | '\u{2212}' | '\u{02D7}' | '\u{FE58}'
        | '\u{FE63}' | '\u{FF0D}' => '-',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_full_width_forms() {
        assert_eq!(normalize_text("Ｗ＝１２００"), "W=1200");
        assert_eq!(normalize_text("Ｈ：５０"), "H:50");
        assert_eq!(normalize_text("３００＊３００"), "300*300");
    }

    #[test]
    fn unifies_dash_variants() {
        assert_eq!(normalize_text("W‐1200"), "W-1200");
        assert_eq!(normalize_text("L−900"), "L-900");
        assert_eq!(normalize_text("H―50"), "H-50");
        assert_eq!(normalize_text("H－50"), "H-50");
    }

    #[test]
    fn keeps_prolonged_sound_mark() {
        assert_eq!(normalize_text("シーリング"), "シーリング");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_text("  塗装\u{3000}\u{3000}工事 \n 一式 "), "塗装 工事 一式");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn expands_unit_ligatures() {
        assert_eq!(normalize_text("㎡"), "m2");
        assert_eq!(normalize_text("㎥"), "m3");
        assert_eq!(normalize_text("㎜"), "mm");
    }
}
