//! Channel truncation

use super::pair::ConvPair;
use crate::nn::Model;
use crate::Result;

/// Keep the first `keep` channels of a pair and drop the rest.
///
/// After [`super::sort_pair`] the first channels are the most important,
/// so this removes the weakest ones.
pub fn truncate_pair(model: &mut Model, pair: ConvPair, keep: usize) -> Result<()> {
    let kept: Vec<usize> = (0..keep).collect();
    pair.select_channels(model, &kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::VggConfig;
    use crate::Error;
    use ndarray::s;

    #[test]
    fn test_truncate_keeps_leading_channels() {
        let original = Model::vgg(&VggConfig::parse("6,4", 1, 2).unwrap(), 9).unwrap();
        let mut m = original.clone();
        let pair = ConvPair::all(&m)[0];
        truncate_pair(&mut m, pair, 2).unwrap();

        let producer = m.features[0].as_conv().unwrap();
        let consumer = m.features[3].as_conv().unwrap();
        let original_producer = original.features[0].as_conv().unwrap();
        let original_consumer = original.features[3].as_conv().unwrap();
        assert_eq!(producer.weight, original_producer.weight.slice(s![..2, .., .., ..]));
        assert_eq!(consumer.weight, original_consumer.weight.slice(s![.., ..2, .., ..]));
        m.validate().unwrap();
    }

    #[test]
    fn test_truncate_beyond_width_fails() {
        let mut m = Model::vgg(&VggConfig::parse("3,3", 1, 2).unwrap(), 0).unwrap();
        let pair = ConvPair::all(&m)[0];
        assert!(matches!(
            truncate_pair(&mut m, pair, 4),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
