//! Data-parallel maps with one output slot per input.
//!
//! With the `rayon` feature the maps run on the global thread pool; without it
//! they run serially. Each worker writes only the slot of the item it owns, so
//! no synchronisation is needed beyond the final collect.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// `out[i] = f(i)` for `i in 0..n`.
pub fn map_indexed<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        (0..n).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..n).map(f).collect()
    }
}

/// `out[i] = f(&data[i * width..(i + 1) * width])`.
pub fn map_chunks<T, F>(data: &[usize], width: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&[usize]) -> T + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        data.par_chunks(width).map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        data.chunks(width).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_follow_input_order() {
        assert_eq!(map_indexed(5, |i| i * i), vec![0, 1, 4, 9, 16]);
        assert_eq!(map_chunks(&[1, 2, 3, 4, 5, 6], 3, |c| c.iter().sum::<usize>()), vec![6, 15]);
        assert!(map_indexed(0, |i| i).is_empty());
    }
}
