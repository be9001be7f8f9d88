//! Peptide sequence normalization

use regex::Regex;
use std::sync::LazyLock;

const THREE_LETTER: [(&str, char); 22] = [
    ("ala", 'A'),
    ("arg", 'R'),
    ("asn", 'N'),
    ("asp", 'D'),
    ("cys", 'C'),
    ("gln", 'Q'),
    ("glu", 'E'),
    ("gly", 'G'),
    ("his", 'H'),
    ("ile", 'I'),
    ("leu", 'L'),
    ("lys", 'K'),
    ("met", 'M'),
    ("phe", 'F'),
    ("pro", 'P'),
    ("ser", 'S'),
    ("thr", 'T'),
    ("trp", 'W'),
    ("tyr", 'Y'),
    ("val", 'V'),
    ("sec", 'U'),
    ("pyl", 'O'),
];

const ONE_LETTER: &str = "ACDEFGHIKLMNPQRSTVWYUO";

const N_CAPS: [&str; 6] = ["ac", "h", "boc", "fmoc", "cbz", "z"];
const C_CAPS: [&str; 5] = ["nh2", "oh", "ome", "oet", "nhme"];

const AA3: &str = "Ala|Arg|Asn|Asp|Cys|Gln|Glu|Gly|His|Ile|Leu|Lys|Met|Phe|Pro|Ser|Thr|Trp|Tyr|Val|Sec|Pyl";

/// Three-letter residue chains such as `H-Phe-Phe-OH` or `Gly-His`.
static THREE_LETTER_CHAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:(?:Ac|H|Boc|Fmoc|Cbz|Z)-)?(?:[LD]-)?(?:{aa})(?:-(?:[LD]-)?(?:{aa}))+(?:-(?:NH2|OH|OMe|OEt|NHMe))?$",
        aa = AA3
    ))
    .expect("three-letter peptide pattern is valid")
});

/// Capped one-letter sequences such as `Ac-HLVFFAE` or `KLVFF-NH2`.
static CAPPED_ONE_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:Ac|Boc|Fmoc|Cbz)-[ACDEFGHIKLMNPQRSTVWY]{2,}(?:-(?:NH2|OH|OMe|OEt))?|(?:Ac-|H-)?[ACDEFGHIKLMNPQRSTVWY]{2,}-(?:NH2|OH|OMe|OEt))$",
    )
    .expect("capped one-letter peptide pattern is valid")
});

/// Hyphenated one-letter sequences such as `L-V-F-F`.
static HYPHENATED_ONE_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ACDEFGHIKLMNPQRSTVWY](?:-[ACDEFGHIKLMNPQRSTVWY]){2,}$")
        .expect("hyphenated peptide pattern is valid")
});

/// Whether a whitespace-free string reads as peptide sequence notation.
pub fn looks_like_peptide(compact: &str) -> bool {
    THREE_LETTER_CHAIN.is_match(compact)
        || CAPPED_ONE_LETTER.is_match(compact)
        || HYPHENATED_ONE_LETTER.is_match(compact)
}

fn three_to_one(token: &str) -> Option<char> {
    let lower = token.to_ascii_lowercase();
    THREE_LETTER
        .iter()
        .find(|(code, _)| *code == lower)
        .map(|(_, one)| *one)
}

/// Normalize a peptide string to its bare one-letter sequence.
///
/// Terminal protection tokens are stripped, three-letter codes converted,
/// separators dropped and the result uppercased. Returns `None` when
/// anything other than residue codes remains.
pub fn normalize_peptide(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.starts_with('-') || compact.ends_with('-') {
        return None;
    }
    let mut tokens: Vec<&str> = compact.split('-').filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return None;
    }

    let all_single = tokens.iter().all(|t| t.chars().count() == 1);
    if tokens.len() > 1 && !all_single && N_CAPS.contains(&tokens[0].to_ascii_lowercase().as_str()) {
        tokens.remove(0);
    }
    if tokens.len() > 1 && C_CAPS.contains(&tokens[tokens.len() - 1].to_ascii_lowercase().as_str()) {
        tokens.pop();
    }

    let mut sequence = String::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        let next_is_three = tokens.get(i + 1).is_some_and(|t| three_to_one(t).is_some());
        if token.len() == 1 && matches!(token, "L" | "D" | "l" | "d") && next_is_three {
            // Stereo descriptor of the following residue.
            i += 1;
            continue;
        }
        if token.len() == 3 {
            if let Some(one) = three_to_one(token) {
                sequence.push(one);
                i += 1;
                continue;
            }
        }
        let upper = token.to_ascii_uppercase();
        if !upper.chars().all(|c| ONE_LETTER.contains(c)) {
            return None;
        }
        sequence.push_str(&upper);
        i += 1;
    }

    (!sequence.is_empty()).then_some(sequence)
}
