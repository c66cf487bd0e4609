use rayon::prelude::*;

/// Replaces each `None` with a clone of the most recent `Some` at a lower index.
/// Leading `None`s (nothing seen yet) are left alone.
/// Returns how many slots were filled.
pub(crate) fn fill_forward_mut<T>(data: &mut [Option<T>]) -> usize
where
    T: Clone,
{
    let mut last_value: Option<T> = None;
    let mut total_replaced = 0;

    for item in data.iter_mut() {
        if let Some(value) = item {
            last_value = Some(value.clone());
        } else if let Some(last) = &last_value {
            *item = Some(last.clone());
            total_replaced += 1;
        }
    }
    total_replaced
}

pub(crate) fn count_none_elements<T: Sync>(vec_of_options: &[Option<T>]) -> usize {
    vec_of_options
        .par_iter()
        .filter(|option| option.is_none())
        .count()
}

/// Length of the run of `None`s at the start of the slice.
pub(crate) fn leading_none_count<T>(data: &[Option<T>]) -> usize {
    data.iter().take_while(|item| item.is_none()).count()
}
