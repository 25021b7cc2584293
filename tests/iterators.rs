use hdrinterval::iterators::IterationValue;
use hdrinterval::Histogram;

fn histo64(low: i64, high: i64, sigfig: u8) -> Histogram<u64> {
    Histogram::<u64>::new_with_bounds(low, high, sigfig).unwrap()
}

fn load_corrected() -> (Histogram<u64>, Histogram<u64>) {
    let hist = histo64(1, 3600 * 1000 * 1000, 3);
    let raw = histo64(1, 3600 * 1000 * 1000, 3);

    for _ in 0..10000 {
        hist.record_corrected_value(1000, 10000).unwrap();
        raw.record_value(1000).unwrap();
    }
    hist.record_corrected_value(100_000_000, 10000).unwrap();
    raw.record_value(100_000_000).unwrap();

    (hist, raw)
}

#[test]
fn empty_histogram_yields_nothing() {
    let h = histo64(1, 100_000, 3);

    assert_eq!(0, h.iter_recorded().count());
    assert_eq!(0, h.iter_percentiles(5).count());
    assert_eq!(0, h.iter_linear(100).count());
    assert_eq!(0, h.iter_log(1, 2.0).count());
}

#[test]
fn iter_recorded_values() {
    let h = histo64(1, i64::max_value(), 3);

    h.record_value(1).unwrap();
    h.record_value(1_000).unwrap();
    h.record_value(1_000_000).unwrap();

    let expected = vec![1, 1_000, h.highest_equivalent_value(1_000_000)];
    assert_eq!(
        expected,
        h.iter_recorded()
            .map(|iv| iv.value_iterated_to())
            .collect::<Vec<i64>>()
    );
}

#[test]
fn iter_recorded_values_all_buckets() {
    let h = histo64(1, 8191, 3);

    h.record_value(1).unwrap();
    h.record_value(2).unwrap();
    // first in top half
    h.record_value(1024).unwrap();
    // first in 2nd bucket
    h.record_value(2048).unwrap();
    // first in 3rd
    h.record_value(4096).unwrap();
    // smallest value in last sub bucket of third
    h.record_value(8192 - 4).unwrap();

    let iter_values: Vec<(i64, u64, u64)> = h
        .iter_recorded()
        .map(|v| {
            (
                v.value_iterated_to(),
                v.count_at_value(),
                v.count_since_last_iteration(),
            )
        })
        .collect();

    let expected = vec![
        (1, 1, 1),
        (2, 1, 1),
        (1024, 1, 1),
        (2048 + 1, 1, 1),
        (4096 + 3, 1, 1),
        (8192 - 1, 1, 1),
    ];

    assert_eq!(expected, iter_values);
}

#[test]
fn iter_recorded_values_all_buckets_unit_magnitude_2() {
    let h = histo64(4, 16384 - 1, 3);

    h.record_value(4).unwrap();
    // first in top half
    h.record_value(4096).unwrap();
    // first in second bucket
    h.record_value(8192).unwrap();
    // smallest value in last sub bucket of second
    h.record_value(16384 - 8).unwrap();

    let iter_values: Vec<(i64, i64)> = h
        .iter_recorded()
        .map(|v| (v.value_from_index(), v.value_iterated_to()))
        .collect();

    let expected = vec![
        (4, 4 + 3),
        (4096, 4096 + 3),
        (8192, 8192 + 7),
        (16384 - 8, 16384 - 1),
    ];

    assert_eq!(expected, iter_values);
}

#[test]
fn iter_recorded_matches_added_counts() {
    let (hist, raw) = load_corrected();

    // Iterate raw data by stepping through every value that has a count recorded:
    let since: Vec<u64> = raw
        .iter_recorded()
        .map(|v| v.count_since_last_iteration())
        .collect();
    assert_eq!(vec![10000, 1], since);

    let mut total_added_counts = 0;
    for (i, v) in hist.iter_recorded().enumerate() {
        if i == 0 {
            assert_eq!(10000, v.count_since_last_iteration());
        }

        // The count in a recorded iterator value should never be zero
        assert!(v.count_at_value() != 0);
        // The count in a recorded iterator value should exactly match the amount added since the
        // last iteration
        assert_eq!(v.count_at_value(), v.count_since_last_iteration());

        total_added_counts += v.count_since_last_iteration();
        assert_eq!(total_added_counts, v.cumulative_count());
    }
    assert_eq!(20000, total_added_counts);
}

#[test]
fn iter_linear_count_since_last_iteration() {
    let h = histo64(1, i64::max_value(), 3);

    h.record_values(1, 5).unwrap();
    h.record_values(4, 3).unwrap();
    h.record_values(5, 3).unwrap();
    h.record_values(6, 100).unwrap();
    h.record_values(7, 200).unwrap();
    h.record_values(10, 400).unwrap();

    let expected = vec![
        // 0-1 has 1's count
        (1, 5),
        // 2-3 has nothing
        (3, 0),
        // 4-5 has both
        (5, 6),
        // 6-7 doesn't include 4-5
        (7, 300),
        // 8-9 has nothing
        (9, 0),
        // 10-11 has just 10's count
        (11, 400),
    ];

    // step in 2s to test count accumulation for each step
    assert_eq!(
        expected,
        h.iter_linear(2)
            .map(|iv| (iv.value_iterated_to(), iv.count_since_last_iteration()))
            .collect::<Vec<(i64, u64)>>()
    );
}

fn record_across_three_bucket_sizes(h: &Histogram<u64>) {
    h.record_value(1).unwrap();
    h.record_value(2047).unwrap();
    // bucket size 2
    h.record_value(2048).unwrap();
    h.record_value(2049).unwrap();
    h.record_value(4095).unwrap();
    // bucket size 4
    h.record_value(4096).unwrap();
    h.record_value(4097).unwrap();
    h.record_value(4098).unwrap();
    h.record_value(4099).unwrap();
    // 2nd bucket in size 4
    h.record_value(4100).unwrap();
}

#[test]
fn iter_linear_visits_buckets_wider_than_step_size_multiple_times() {
    let h = histo64(1, i64::max_value(), 3);
    record_across_three_bucket_sizes(&h);

    let iter_values = h
        .iter_linear(1)
        .map(|iv| (iv.value_iterated_to(), iv.count_since_last_iteration()))
        .collect::<Vec<(i64, u64)>>();

    // bucket size 1
    assert_eq!((0, 0), iter_values[0]);
    assert_eq!((1, 1), iter_values[1]);
    assert_eq!((2046, 0), iter_values[2046]);
    assert_eq!((2047, 1), iter_values[2047]);
    // bucket size 2
    assert_eq!((2048, 2), iter_values[2048]);
    assert_eq!((2049, 0), iter_values[2049]);
    assert_eq!((2050, 0), iter_values[2050]);
    assert_eq!((4094, 1), iter_values[4094]);
    assert_eq!((4095, 0), iter_values[4095]);
    // bucket size 4
    assert_eq!((4096, 4), iter_values[4096]);
    assert_eq!((4097, 0), iter_values[4097]);
    // also size 4, last bucket
    assert_eq!((4100, 1), iter_values[4100]);
    assert_eq!((4103, 0), iter_values[4103]);

    assert_eq!(4104, iter_values.len());
}

#[test]
fn iter_linear_visits_buckets_once_when_step_size_equals_bucket_size() {
    let h = histo64(1, i64::max_value(), 3);
    record_across_three_bucket_sizes(&h);

    let iter_values = h
        .iter_linear(4)
        .map(|iv| (iv.value_iterated_to(), iv.count_since_last_iteration()))
        .collect::<Vec<(i64, u64)>>();

    // bucket size 1
    assert_eq!((3, 1), iter_values[0]);
    assert_eq!((2047, 1), iter_values[511]);
    // bucket size 2
    assert_eq!((2051, 2), iter_values[512]);
    assert_eq!((4095, 1), iter_values[1023]);
    // bucket size 4
    assert_eq!((4099, 4), iter_values[1024]);
    // also size 4, last bucket
    assert_eq!((4103, 1), iter_values[1025]);

    assert_eq!(1026, iter_values.len());
}

#[test]
fn iter_linear_bucket_values_size_8_all_buckets() {
    // 32 sub-buckets with scale 1, then 16 with scale 2
    let h = histo64(1, 63, 1);
    assert_eq!(64, h.len());

    h.record_value(3).unwrap();
    h.record_value(4).unwrap();
    h.record_value(7).unwrap();

    // top half of first bucket
    h.record_value(24).unwrap();
    h.record_value(25).unwrap();

    h.record_value(61).unwrap();
    // stored in same sub bucket as last value
    h.record_value(62).unwrap();
    h.record_value(63).unwrap();

    let iter_values: Vec<(i64, u64, u64)> = h
        .iter_linear(8)
        .map(|v| {
            (
                v.value_iterated_to(),
                v.count_since_last_iteration(),
                v.count_at_value(),
            )
        })
        .collect();

    let expected = vec![
        (7, 3, 1),
        (15, 0, 0),
        (23, 0, 0),
        (31, 2, 0),
        (39, 0, 0),
        (47, 0, 0),
        (55, 0, 0),
        (63, 3, 2),
    ];

    assert_eq!(expected, iter_values);
}

#[test]
fn iter_linear_runs_to_the_end_of_the_last_slot() {
    let (hist, raw) = load_corrected();

    // Iterate raw data using linear buckets of 100 msec each.
    let mut num = 0;
    for (i, v) in raw.iter_linear(100_000).enumerate() {
        match i {
            // Raw Linear 100 msec bucket # 0 added a count of 10000
            0 => assert_eq!(10000, v.count_since_last_iteration()),
            // Raw Linear 100 msec bucket # 999 added a count of 1
            999 => assert_eq!(1, v.count_since_last_iteration()),
            // Remaining raw Linear 100 msec buckets add a count of 0
            _ => assert_eq!(0, v.count_since_last_iteration()),
        }
        num += 1;
    }
    assert_eq!(1000, num);

    // Because value resolution is low enough (3 digits) that multiple linear buckets will end
    // up residing in a single value-equivalent range, some linear buckets will have counts of
    // 2 or more, and some will have 0. The sum of counts added is still the total.
    let steps: Vec<u64> = hist
        .iter_linear(10000)
        .map(|v| v.count_since_last_iteration())
        .collect();
    assert_eq!(10000, steps[0]);
    // There should be 10000 linear buckets of size 10000 usec between 0 and 100 sec.
    assert_eq!(10000, steps.len());
    assert_eq!(20000, steps.iter().sum::<u64>());

    let steps: Vec<u64> = hist
        .iter_linear(1000)
        .map(|v| v.count_since_last_iteration())
        .collect();
    assert_eq!(10000, steps[1]);
    // The final populated slot (at 100 seconds with 3 decimal point resolution) is wider than a
    // 1 msec step, so the iteration runs 7 steps past 100000 to the end of it.
    assert_eq!(100_007, steps.len());
    assert_eq!(20000, steps.iter().sum::<u64>());
}

fn prepare_histo_for_logarithmic_iterator() -> Histogram<u64> {
    let h = histo64(1, 4095, 3);

    h.record_value(1).unwrap();
    h.record_value(2).unwrap();

    // inside [2^4, 2^5)
    h.record_value(20).unwrap();
    h.record_value(25).unwrap();
    h.record_value(31).unwrap();

    // in 2nd half
    h.record_value(1500).unwrap();
    h.record_value(1600).unwrap();
    h.record_value(1700).unwrap();

    // in last sub bucket of 2nd bucket
    h.record_value(4096 - 1).unwrap();

    h
}

fn log_values(h: &Histogram<u64>, first: i64, base: f64) -> Vec<(i64, u64, u64)> {
    h.iter_log(first, base)
        .map(|v| {
            (
                v.value_iterated_to(),
                v.count_since_last_iteration(),
                v.count_at_value(),
            )
        })
        .collect()
}

#[test]
fn iter_logarithmic_bucket_values_min_1_base_2_all_buckets() {
    let h = prepare_histo_for_logarithmic_iterator();

    let expected = vec![
        (0, 0, 0),
        (1, 1, 1),
        (3, 1, 0),
        (7, 0, 0),
        (15, 0, 0),
        (31, 3, 1),
        (63, 0, 0),
        (127, 0, 0),
        (255, 0, 0),
        (511, 0, 0),
        (1023, 0, 0),
        (2047, 3, 0),
        (4095, 1, 1),
    ];

    assert_eq!(expected, log_values(&h, 1, 2.0));
}

#[test]
fn iter_logarithmic_bucket_values_min_4_base_2_all_buckets() {
    let h = prepare_histo_for_logarithmic_iterator();

    let expected = vec![
        (3, 2, 0),
        (7, 0, 0),
        (15, 0, 0),
        (31, 3, 1),
        (63, 0, 0),
        (127, 0, 0),
        (255, 0, 0),
        (511, 0, 0),
        (1023, 0, 0),
        (2047, 3, 0),
        (4095, 1, 1),
    ];

    assert_eq!(expected, log_values(&h, 4, 2.0));
}

#[test]
fn iter_logarithmic_bucket_values_min_1_base_2_all_buckets_unit_magnitude_2() {
    let h = histo64(4, 16383, 3);

    h.record_value(3).unwrap();
    h.record_value(4).unwrap();

    // inside [2^(4 + 2), 2^(5 + 2)
    h.record_value(70).unwrap();
    h.record_value(80).unwrap();
    h.record_value(90).unwrap();

    // in 2nd half
    h.record_value(5000).unwrap();
    h.record_value(5100).unwrap();
    h.record_value(5200).unwrap();

    // in last sub bucket of 2nd bucket
    h.record_value(16384 - 1).unwrap();

    // first 3 iterations are just getting up to 3, which is still the '0' sub bucket.
    // All at the same index, so count_at_value stays at 1 for the first 3
    let expected = vec![
        (0, 1, 1),
        (1, 0, 1),
        (3, 0, 1),
        (7, 1, 1),
        (15, 0, 0),
        (31, 0, 0),
        (63, 0, 0),
        (127, 3, 0),
        (255, 0, 0),
        (511, 0, 0),
        (1023, 0, 0),
        (2047, 0, 0),
        (4095, 0, 0),
        (8191, 3, 0),
        (16383, 1, 1),
    ];

    assert_eq!(expected, log_values(&h, 1, 2.0));
}

#[test]
fn iter_logarithmic_bucket_values_min_1_base_10_all_buckets() {
    let h = prepare_histo_for_logarithmic_iterator();

    // the last step ends in an empty slot past the recorded values
    let expected = vec![
        (0, 0, 0),
        (9, 2, 0),
        (99, 3, 0),
        (999, 0, 0),
        (9999, 4, 0),
    ];

    assert_eq!(expected, log_values(&h, 1, 10.0));
}

#[test]
fn iter_log_over_corrected_data() {
    let (hist, raw) = load_corrected();

    // Iterate raw data using logarithmic buckets starting at 10 msec.
    let mut num = 0;
    for (i, v) in raw.iter_log(10000, 2.0).enumerate() {
        match i {
            // Raw logarithmic 10 msec bucket # 0 added a count of 10000
            0 => assert_eq!(10000, v.count_since_last_iteration()),
            // Raw logarithmic 10 msec bucket # 14 added a count of 1
            14 => assert_eq!(1, v.count_since_last_iteration()),
            // Remaining raw logarithmic 100 msec buckets add a count of 0
            _ => assert_eq!(0, v.count_since_last_iteration()),
        }
        num += 1;
    }
    assert_eq!(14, num - 1);

    let steps: Vec<u64> = hist
        .iter_log(10000, 2.0)
        .map(|v| v.count_since_last_iteration())
        .collect();
    assert_eq!(10000, steps[0]);
    // There should be 14 Logarithmic buckets of size 10000 usec between 0 and 100 sec.
    assert_eq!(14, steps.len() - 1);
    assert_eq!(20000, steps.iter().sum::<u64>());
}

#[test]
fn iter_log_ends_at_the_top_of_the_value_space() {
    let h = histo64(1, i64::max_value(), 3);
    h.record_value(1 << 62).unwrap();

    let iter_values = log_values(&h, 1, 2.0);

    // one step for each 2^k - 1 below 2^63, then the step ending at i64::max_value()
    assert_eq!(64, iter_values.len());
    assert_eq!((0, 0, 0), iter_values[0]);
    assert_eq!(((1 << 62) - 1, 0, 0), iter_values[62]);
    assert_eq!(i64::max_value(), iter_values[63].0);
    assert_eq!(1, iter_values[63].1);
}

fn assert_steps_cover_histogram<I>(h: &Histogram<u64>, iter: I)
where
    I: Iterator<Item = IterationValue>,
{
    // far more than any of these iterations needs
    let steps: Vec<IterationValue> = iter.take(10_000).collect();
    assert!(steps.len() < 10_000, "iteration did not end");

    assert!(steps
        .windows(2)
        .all(|w| w[0].value_iterated_to() < w[1].value_iterated_to()));
    assert_eq!(
        h.total_count(),
        steps
            .iter()
            .map(|v| v.count_since_last_iteration())
            .sum::<u64>()
    );
    // the last step reaches into the slot holding the largest value
    let last = steps.last().unwrap();
    assert!(last.value_iterated_to() >= h.lowest_equivalent_value(h.max()));
}

#[test]
fn stepped_iterators_end_with_values_in_the_top_slots() {
    let tops = [
        1 << 62,
        (1 << 62) + 12345,
        i64::max_value() - (1 << 52),
        i64::max_value() - 1,
        i64::max_value(),
    ];

    for &sigfig in &[1, 2, 3] {
        for &top in &tops {
            let h = histo64(1, i64::max_value(), sigfig);
            h.record_value(1).unwrap();
            h.record_value(1_000_000).unwrap();
            h.record_value(top).unwrap();

            assert_steps_cover_histogram(&h, h.iter_log(1, 2.0));
            assert_steps_cover_histogram(&h, h.iter_log(1000, 10.0));
            assert_steps_cover_histogram(&h, h.iter_log(1000, 1.5));
            assert_steps_cover_histogram(&h, h.iter_linear(1 << 60));
            // the last step saturates at i64::max_value()
            assert_steps_cover_histogram(&h, h.iter_linear(3 << 60));
        }
    }
}

#[test]
fn iter_linear_saturating_step_ends_at_the_top() {
    let h = histo64(1, i64::max_value(), 3);
    h.record_value(1 << 62).unwrap();
    h.record_value(i64::max_value()).unwrap();

    let iter_values = h
        .iter_linear(3 << 60)
        .map(|iv| (iv.value_iterated_to(), iv.count_since_last_iteration()))
        .collect::<Vec<(i64, u64)>>();

    assert_eq!(
        vec![
            ((3 << 60) - 1, 0),
            ((6 << 60) - 1, 1),
            (i64::max_value(), 1),
        ],
        iter_values
    );
}

#[test]
fn iter_percentiles_ticks_1() {
    let h = histo64(1, 1000, 3);
    for v in 1..=10 {
        h.record_value(v).unwrap();
    }

    let iter_values: Vec<(i64, f64, u64)> = h
        .iter_percentiles(1)
        .map(|v| (v.value_iterated_to(), v.percentile(), v.cumulative_count()))
        .collect();

    let expected = vec![
        (1, 0.0, 1),
        (5, 50.0, 5),
        (8, 75.0, 8),
        (9, 87.5, 9),
        (10, 93.75, 10),
        // the last value is always reported at 100%
        (10, 100.0, 10),
    ];

    assert_eq!(expected, iter_values);
}

#[test]
fn iter_percentiles_smorgasbord() {
    let h = histo64(1, 4095, 3);

    // one of each value up to 2 buckets
    for i in 0..4096 {
        h.record_value(i).unwrap();
    }

    let iter_values: Vec<(i64, u64, u64, f64, u64)> = h
        .iter_percentiles(2)
        .map(|v| {
            (
                v.value_iterated_to(),
                v.count_since_last_iteration(),
                v.count_at_value(),
                v.percentile(),
                v.cumulative_count(),
            )
        })
        .collect();

    // Two steps per halving of the distance to 100%. Near the end one slot is reported for
    // several percentile levels.
    let expected = vec![
        (0, 1, 1, 0.0, 1),
        (1023, 1023, 1, 25.0, 1024),
        (2047, 1024, 1, 50.0, 2048),
        (2559, 512, 2, 62.5, 2560),
        (3071, 512, 2, 75.0, 3072),
        (3327, 256, 2, 81.25, 3328),
        (3583, 256, 2, 87.5, 3584),
        (3711, 128, 2, 90.625, 3712),
        (3839, 128, 2, 93.75, 3840),
        (3903, 64, 2, 95.3125, 3904),
        (3967, 64, 2, 96.875, 3968),
        (3999, 32, 2, 97.65625, 4000),
        (4031, 32, 2, 98.4375, 4032),
        (4047, 16, 2, 98.828125, 4048),
        (4063, 16, 2, 99.21875, 4064),
        (4071, 8, 2, 99.4140625, 4072),
        (4079, 8, 2, 99.609375, 4080),
        (4083, 4, 2, 99.70703125, 4084),
        (4087, 4, 2, 99.8046875, 4088),
        (4089, 2, 2, 99.853515625, 4090),
        (4091, 2, 2, 99.90234375, 4092),
        (4093, 2, 2, 99.9267578125, 4094),
        (4093, 0, 2, 99.951171875, 4094),
        (4095, 2, 2, 99.96337890625, 4096),
        (4095, 0, 2, 100.0, 4096),
    ];

    assert_eq!(expected, iter_values);
}

#[test]
fn iter_percentiles_over_corrected_data() {
    let (hist, _) = load_corrected();

    let values: Vec<_> = hist.iter_percentiles(5).collect();

    assert!(values
        .windows(2)
        .all(|w| w[0].percentile() < w[1].percentile()
            && w[0].value_iterated_to() <= w[1].value_iterated_to()));
    assert_eq!(0.0, values[0].percentile());

    let last = values.last().unwrap();
    assert_eq!(100.0, last.percentile());
    assert_eq!(hist.max(), last.value_iterated_to());
    assert_eq!(hist.total_count(), last.cumulative_count());
    assert_eq!(
        hist.total_count(),
        values
            .iter()
            .map(|v| v.count_since_last_iteration())
            .sum::<u64>()
    );
}

#[test]
fn iterators_can_be_restarted() {
    let h = prepare_histo_for_logarithmic_iterator();

    assert_eq!(
        h.iter_recorded().collect::<Vec<_>>(),
        h.iter_recorded().collect::<Vec<_>>()
    );
    assert_eq!(
        h.iter_percentiles(3).collect::<Vec<_>>(),
        h.iter_percentiles(3).collect::<Vec<_>>()
    );
}

#[test]
#[should_panic]
fn iter_linear_rejects_zero_step() {
    let h = histo64(1, 1000, 3);
    h.iter_linear(0);
}

#[test]
#[should_panic]
fn iter_log_rejects_base_one() {
    let h = histo64(1, 1000, 3);
    h.iter_log(1, 1.0);
}
