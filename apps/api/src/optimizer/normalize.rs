use crate::optimizer::objectives::ObjectiveVector;

/// Min-max scales every objective over the set. An objective with zero
/// span normalizes to 0 for every candidate.
pub fn normalize(vectors: &[ObjectiveVector]) -> Vec<ObjectiveVector> {
    if vectors.is_empty() {
        return Vec::new();
    }

    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for v in vectors {
        for (k, value) in v.as_array().into_iter().enumerate() {
            min[k] = min[k].min(value);
            max[k] = max[k].max(value);
        }
    }

    vectors
        .iter()
        .map(|v| {
            let mut out = v.as_array();
            for (k, value) in out.iter_mut().enumerate() {
                let span = max[k] - min[k];
                *value = if span > 0.0 { (*value - min[k]) / span } else { 0.0 };
            }
            ObjectiveVector::from_array(out)
        })
        .collect()
}
