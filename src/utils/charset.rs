use indexmap::IndexSet;
use num_traits::PrimInt;

/// Maps between label strings and class ids.
///
/// Id layout: `[EOS]` is 0, charset characters are `1..=n`, `[BOS]` is
/// `n + 1` and `[PAD]` is `n + 2`, so the padding id is always the largest
/// class and can be ignored by the loss.
#[derive(Clone, Debug)]
pub struct CharsetMapper {
    charset: IndexSet<char>,
    eos_id: u32,
    bos_id: u32,
    pad_id: u32,
}

impl CharsetMapper {
    pub fn new(charset: &str) -> Self {
        let charset: IndexSet<char> = charset.chars().collect();
        assert!(!charset.is_empty(), "charset must not be empty");
        let n = charset.len() as u32;

        Self {
            charset,
            eos_id: 0,
            bos_id: n + 1,
            pad_id: n + 2,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.charset.len() + 3
    }

    pub fn eos_id(&self) -> u32 {
        self.eos_id
    }

    pub fn bos_id(&self) -> u32 {
        self.bos_id
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    pub fn char_to_id(&self, ch: char) -> Option<u32> {
        self.charset.get_index_of(&ch).map(|idx| idx as u32 + 1)
    }

    pub fn id_to_char(&self, id: u32) -> Option<char> {
        if id == 0 || id > self.charset.len() as u32 {
            return None;
        }
        self.charset.get_index(id as usize - 1).copied()
    }

    /// Whether every character of `text` is representable.
    pub fn contains_all(&self, text: &str) -> bool {
        text.chars().all(|ch| self.charset.contains(&ch))
    }

    /// Encodes `text` as `[BOS] ids.. [EOS]`, padded with `[PAD]` up to
    /// `pad_to` when given. Characters outside the charset are skipped.
    pub fn encode(&self, text: &str, pad_to: Option<usize>) -> Vec<u32> {
        let mut res = Vec::with_capacity(pad_to.unwrap_or(text.chars().count() + 2));
        res.push(self.bos_id);
        res.extend(text.chars().filter_map(|ch| self.char_to_id(ch)));
        res.push(self.eos_id);
        if let Some(len) = pad_to {
            assert!(res.len() <= len, "label longer than padded length {len}");
            res.resize(len, self.pad_id);
        }

        res
    }

    /// Decodes batched id sequences, cutting each at the first `[EOS]`.
    pub fn decode<I: PrimInt>(&self, encoded: &[Vec<I>]) -> Vec<String> {
        encoded
            .iter()
            .map(|ids| {
                let mut text = String::with_capacity(ids.len());
                for id in ids {
                    let id = id.to_u32().unwrap_or(self.pad_id);
                    if id == self.eos_id {
                        break;
                    }
                    if let Some(ch) = self.id_to_char(id) {
                        text.push(ch);
                    }
                }

                text
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHARSET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

    #[test]
    fn id_layout() {
        let mapper = CharsetMapper::new(CHARSET);
        assert_eq!(mapper.num_classes(), 39);
        assert_eq!(mapper.eos_id(), 0);
        assert_eq!(mapper.bos_id(), 37);
        assert_eq!(mapper.pad_id(), 38);
        assert_eq!(mapper.char_to_id('0'), Some(1));
        assert_eq!(mapper.char_to_id('z'), Some(36));
        assert_eq!(mapper.char_to_id('Z'), None);
        assert_eq!(mapper.id_to_char(1), Some('0'));
        assert_eq!(mapper.id_to_char(0), None);
        assert_eq!(mapper.id_to_char(38), None);
    }

    #[test]
    fn encode_pads_to_length() {
        let mapper = CharsetMapper::new(CHARSET);
        let encoded = mapper.encode("ab1", Some(8));
        assert_eq!(encoded, vec![37, 11, 12, 2, 0, 38, 38, 38]);
    }

    #[test]
    fn encode_skips_unknown_chars() {
        let mapper = CharsetMapper::new(CHARSET);
        let encoded = mapper.encode("a!b", None);
        assert_eq!(encoded, vec![37, 11, 12, 0]);
        assert!(!mapper.contains_all("a!b"));
        assert!(mapper.contains_all("ab"));
    }

    #[test]
    fn decode_cuts_at_eos() {
        let mapper = CharsetMapper::new(CHARSET);
        let decoded = mapper.decode(&[
            vec![37i64, 11, 12, 2, 0, 38, 38, 38],
            vec![37, 36, 0, 0, 38],
        ]);
        assert_eq!(decoded, vec!["ab1".to_string(), "z".to_string()]);
    }

    #[test]
    fn decode_roundtrip_without_bos() {
        let mapper = CharsetMapper::new(CHARSET);
        let encoded: Vec<i32> = mapper.encode("hello42", Some(12))[1..]
            .iter()
            .map(|&id| id as i32)
            .collect();
        assert_eq!(mapper.decode(&[encoded]), vec!["hello42".to_string()]);
    }
}
