mod maths_utils;
mod perf;
mod time_utils;
mod vec_utils;

pub use time_utils::{DATE_KEY_FORMAT, format_date_key, parse_date_key};

pub(crate) use maths_utils::{mean, min_max_present, normalize_min_max};
pub(crate) use vec_utils::{count_none_elements, fill_forward_mut, leading_none_count};
