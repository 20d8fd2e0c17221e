//! Canonical identity of a series

/// Canonical identity for the series a point belongs to
///
/// Rendered as `endpoint=<endpoint>;metric=<metric>` followed by `;<key>=<value>` for every tag,
/// tags sorted by key. Two tag sets holding the same pairs always give the same identity,
/// whatever order they iterate in.
///
/// ```
/// use rollup::key::metric_key;
/// use std::collections::HashMap;
///
/// let tags = HashMap::from([("region", "eu"), ("host", "a")]);
/// assert_eq!(
///     metric_key("e1", "cpu.idle", &tags),
///     "endpoint=e1;metric=cpu.idle;host=a;region=eu"
/// );
/// ```
pub fn metric_key<I, K, V>(endpoint: &str, metric: &str, tags: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut tags: Vec<(K, V)> = tags.into_iter().collect();
    tags.sort_unstable_by(|(a, _), (b, _)| a.as_ref().cmp(b.as_ref()));

    let capacity = "endpoint=;metric=".len()
        + endpoint.len()
        + metric.len()
        + tags
            .iter()
            .map(|(k, v)| k.as_ref().len() + v.as_ref().len() + 2)
            .sum::<usize>();
    let mut key = String::with_capacity(capacity);
    key.push_str("endpoint=");
    key.push_str(endpoint);
    key.push_str(";metric=");
    key.push_str(metric);
    for (k, v) in &tags {
        key.push(';');
        key.push_str(k.as_ref());
        key.push('=');
        key.push_str(v.as_ref());
    }
    key
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use assert2::check;
    use rand::{SeedableRng, seq::SliceRandom};
    use rand_chacha::ChaCha8Rng;

    use super::metric_key;

    #[test]
    fn no_tags() {
        let tags = HashMap::<String, String>::new();
        check!(metric_key("e1", "m1", &tags) == "endpoint=e1;metric=m1");
    }

    #[test]
    fn tags_are_sorted_by_key() {
        let tags = [("zone", "b"), ("app", "x"), ("mode", "idle")];
        check!(metric_key("e", "m", tags) == "endpoint=e;metric=m;app=x;mode=idle;zone=b");
    }

    #[test]
    fn permutations_share_a_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut pairs: Vec<(String, String)> = (0..12)
            .map(|i| (format!("tag{i}"), format!("value{}", i * 3)))
            .collect();
        let expected = metric_key("host", "disk.used", pairs.iter().map(|(k, v)| (k, v)));
        for _ in 0..20 {
            pairs.shuffle(&mut rng);
            let key = metric_key("host", "disk.used", pairs.iter().map(|(k, v)| (k, v)));
            check!(key == expected);
        }

        let as_hash: HashMap<_, _> = pairs.iter().cloned().collect();
        let as_btree: BTreeMap<_, _> = pairs.iter().cloned().collect();
        check!(metric_key("host", "disk.used", &as_hash) == expected);
        check!(metric_key("host", "disk.used", &as_btree) == expected);
    }

    #[test]
    fn endpoint_and_metric_are_part_of_the_key() {
        let tags = [("k", "v")];
        check!(metric_key("a", "m", tags) != metric_key("b", "m", tags));
        check!(metric_key("a", "m", tags) != metric_key("a", "n", tags));
    }
}
