//! TF-IDF term-weighting index.
//!
//! Fitted exactly once over the corpus text. The vocabulary, IDF weights
//! and the dense weight matrix are frozen afterwards; queries are projected
//! through the same tokenizer and vocabulary and never extend it.
//!
//! Weighting:
//!
//! - tokens: lowercase, split on non-alphanumeric characters (Devanagari
//!   vowel signs stay inside their word), keep purely alphabetic tokens of
//!   two or more characters, drop English stop words
//! - `tf`: raw count of the term in the chunk
//! - `idf = ln((1 + n) / (1 + df)) + 1`, strictly positive and decreasing
//!   in document frequency
//! - every row is L2-normalized

use std::collections::{BTreeSet, HashMap};

/// The standard English stop-word list used by common IR toolkits.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto", "or",
    "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part",
    "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon",
    "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
    "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Devanagari vowel signs, virama and nukta. They are not alphanumeric
/// but belong inside a word.
fn is_devanagari_sign(c: char) -> bool {
    matches!(
        c,
        '\u{0900}'..='\u{0903}'
            | '\u{093A}'..='\u{094F}'
            | '\u{0951}'..='\u{0957}'
            | '\u{0962}'..='\u{0963}'
    )
}

/// Split text into index terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || is_devanagari_sign(c)))
        .filter(|w| w.chars().count() > 1)
        .filter(|w| w.chars().all(|c| c.is_alphabetic() || is_devanagari_sign(c)))
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// A fitted TF-IDF model: sorted vocabulary, IDF weights and the dense
/// `rows × vocabulary` weight matrix (row-major, L2-normalized rows).
#[derive(Debug, Clone)]
pub struct TfIdfIndex {
    vocabulary: Vec<String>,
    term_ids: HashMap<String, usize>,
    idf: Vec<f32>,
    weights: Vec<f32>,
    rows: usize,
}

impl TfIdfIndex {
    /// Fit over the given documents. Row `i` of the matrix is document `i`.
    ///
    /// An empty document list yields an index with no rows and no terms.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let vocabulary: Vec<String> = tokenized
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        let term_ids: HashMap<String, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        let dims = vocabulary.len();
        let mut doc_freq = vec![0usize; dims];
        for tokens in &tokenized {
            let unique: BTreeSet<usize> = tokens.iter().map(|t| term_ids[t]).collect();
            for id in unique {
                doc_freq[id] += 1;
            }
        }

        let n = documents.len() as f32;
        let idf: Vec<f32> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        let mut weights = vec![0.0f32; documents.len() * dims];
        for (row, tokens) in tokenized.iter().enumerate() {
            let slot = &mut weights[row * dims..(row + 1) * dims];
            for token in tokens {
                slot[term_ids[token]] += 1.0;
            }
            for (w, idf) in slot.iter_mut().zip(&idf) {
                *w *= idf;
            }
            normalize(slot);
        }

        Self {
            vocabulary,
            term_ids,
            idf,
            weights,
            rows: documents.len(),
        }
    }

    /// Number of fitted documents.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Vocabulary size.
    pub fn dims(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.term_ids.get(term).map(|&i| self.idf[i])
    }

    /// The weight row of document `i`.
    pub fn row(&self, i: usize) -> &[f32] {
        let dims = self.dims();
        &self.weights[i * dims..(i + 1) * dims]
    }

    /// The whole matrix, row-major.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Project a query into the fitted space.
    ///
    /// Out-of-vocabulary tokens contribute nothing; a query with no known
    /// terms projects to the zero vector.
    pub fn project(&self, query: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims()];
        for token in tokenize(query) {
            if let Some(&id) = self.term_ids.get(&token) {
                vector[id] += 1.0;
            }
        }
        for (w, idf) in vector.iter_mut().zip(&self.idf) {
            *w *= idf;
        }
        normalize(&mut vector);
        vector
    }
}

/// Scale to unit length in place. Zero vectors are left as they are.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_digits_and_punctuation() {
        let tokens = tokenize("The April 2025 attendance was 96.2%, a record!");
        assert_eq!(tokens, vec!["april", "attendance", "record"]);
    }

    #[test]
    fn test_tokenize_splits_snake_case_keys() {
        assert_eq!(
            tokenize("learning_outcomes: foundational_literacy"),
            vec!["learning", "outcomes", "foundational", "literacy"]
        );
    }

    #[test]
    fn test_tokenize_keeps_devanagari_words_whole() {
        assert_eq!(
            tokenize("राष्ट्रीय विद्या समीक्षा केंद्र, उपस्थिति/मूल्यांकन ३५"),
            vec!["राष्ट्रीय", "विद्या", "समीक्षा", "केंद्र", "उपस्थिति", "मूल्यांकन"]
        );
    }

    #[test]
    fn test_vocabulary_sorted_and_unique() {
        let index = TfIdfIndex::fit(&["zebra apple", "apple mango"]);
        assert_eq!(index.vocabulary(), &["apple", "mango", "zebra"]);
        assert_eq!(index.rows(), 2);
        assert_eq!(index.weights().len(), 6);
    }

    #[test]
    fn test_idf_decreases_with_document_frequency() {
        let index = TfIdfIndex::fit(&["apple mango", "apple zebra", "apple kiwi"]);
        let common = index.idf("apple").unwrap();
        let rare = index.idf("mango").unwrap();
        assert!(common > 0.0);
        assert!(rare > common);
        assert!((common - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let index = TfIdfIndex::fit(&["apple apple mango", "zebra kiwi"]);
        for i in 0..index.rows() {
            let norm: f32 = index.row(i).iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stop_word_only_document_has_zero_row() {
        let index = TfIdfIndex::fit(&["the and of", "apple"]);
        assert!(index.row(0).iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_project_unknown_terms_is_zero() {
        let index = TfIdfIndex::fit(&["apple mango"]);
        let q = index.project("lunar colonization funding");
        assert_eq!(q.len(), index.dims());
        assert!(q.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_project_does_not_extend_vocabulary() {
        let index = TfIdfIndex::fit(&["apple mango"]);
        let q = index.project("apple durian");
        assert_eq!(q.len(), 2);
        assert!((q[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_fit() {
        let docs: [&str; 0] = [];
        let index = TfIdfIndex::fit(&docs);
        assert_eq!(index.rows(), 0);
        assert_eq!(index.dims(), 0);
        assert!(index.project("anything").is_empty());
    }
}
