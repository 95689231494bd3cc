//! Common test utilities for distfft integration tests.

#![allow(dead_code)]

use distfft::*;
use num_complex::Complex64;
use std::thread;

/// Dimensions with automatic block sizes
pub fn dims(ns: &[Extent]) -> Vec<Dimension> {
    ns.iter().map(|&n| Dimension::new(n)).collect()
}

/// Zero-filled complex buffer
pub fn complex_zeros(n: Extent) -> Vec<Complex64> {
    vec![Complex64::new(0.0, 0.0); n.max(0) as usize]
}

/// Zero-filled real buffer
pub fn real_zeros(n: Extent) -> Vec<f64> {
    vec![0.0; n.max(0) as usize]
}

/// Run `f` once per member of a simulated group of `size` processes and
/// collect the results in rank order.
pub fn run_group<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&ThreadGroup) -> T + Sync,
{
    let members = ThreadGroup::create(size);
    thread::scope(|s| {
        let handles: Vec<_> = members
            .iter()
            .map(|member| {
                let f = &f;
                s.spawn(move || f(member))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("simulated process panicked"))
            .collect()
    })
}

/// Assert that every rank of a single-batch survey reserves at least its
/// own input and output elements
pub fn assert_covers_local(survey: &DistributionSurvey) {
    for (pe, size) in survey.per_rank().iter().enumerate() {
        let local = size.input.element_count().max(size.output.element_count());
        assert!(
            size.required >= local,
            "rank {}: required {} < local elements {}",
            pe,
            size.required,
            local
        );
    }
}
