#[cfg(feature = "parallel")]
macro_rules! maybe_par_iter {
    ($range:expr) => {
        $range.into_par_iter()
    };
}

#[cfg(not(feature = "parallel"))]
macro_rules! maybe_par_iter {
    ($range:expr) => {
        $range.into_iter()
    };
}
