//! Integration tests for distfft.
//!
//! These tests drive the public API the way a parallel program would: every
//! member of a simulated process group makes the same calls, and the tests
//! check that the members agree on layouts, sizes and chosen algorithms.

use distfft::*;
use std::collections::HashSet;
use tempfile::TempDir;

mod common;
use common::*;

/// A 12x8 array over four processes splits into row blocks of three
#[test]
fn test_slab_layout_over_group() {
    let sizes = run_group(4, |g| {
        local_size_guru(&dims(&[12, 8]), 1, g, None, DistFlags::NONE).unwrap()
    });

    assert_eq!(sizes.len(), 4);
    for (pe, size) in sizes.iter().enumerate() {
        assert_eq!(size.required, 24);
        assert_eq!(size.input.sizes(), &[3, 8]);
        assert_eq!(size.input.starts(), &[3 * pe as Extent, 0]);
        assert_eq!(size.output.sizes(), &[3, 8]);
    }
    assert_eq!(sizes.iter().map(|s| s.required).sum::<Extent>(), 96);

    // The survey computes the same answers without a group
    let survey = DistributionSurvey::survey(&dims(&[12, 8]), 1, 4, None, DistFlags::NONE).unwrap();
    assert_eq!(survey.per_rank(), sizes.as_slice());
    assert_eq!(survey.total_required(), 96);
    assert_covers_local(&survey);
}

/// Slab wrappers agree with the general size query
#[test]
fn test_slab_wrappers_over_group() {
    let slabs = run_group(4, |g| {
        (
            local_size_2d(12, 8, g).unwrap(),
            local_size_2d_transposed(12, 8, g).unwrap(),
        )
    });

    for (pe, (plain, transposed)) in slabs.iter().enumerate() {
        let pe = pe as Extent;
        assert_eq!((plain.local_nx, plain.local_x_start), (3, 3 * pe));
        assert_eq!(plain.required, 24);

        assert_eq!((transposed.local_nx, transposed.local_x_start), (3, 3 * pe));
        assert_eq!((transposed.local_ny, transposed.local_y_start), (2, 2 * pe));
        assert!(transposed.required >= 24);
    }
}

/// An extent with no admissible radix fails the same way for sizing and planning
#[test]
fn test_prime_extent_has_no_radix() {
    let err = estimate(&dims(&[17]), 1, 0, 4, Some(Sign::Forward), DistFlags::NONE).unwrap_err();
    assert!(matches!(
        err,
        DistError::NoValidRadix {
            n: 17,
            num_processes: 4
        }
    ));

    let results = run_group(4, |g| {
        let sized = local_size_1d(17, g, Sign::Forward, DistFlags::NONE);
        let mut data = complex_zeros(17);
        let planned = PlanningContext::new()
            .plan_dft_1d(17, Buffers::InPlace(&mut data), g, Sign::Forward, DistFlags::NONE)
            .map(|plan| plan.solver());
        (sized, planned)
    });

    for (sized, planned) in results {
        assert!(matches!(sized, Err(DistError::NoValidRadix { .. })));
        assert!(matches!(planned, Err(DistError::NoValidRadix { .. })));
    }
}

/// Identical inputs give identical outputs on every call
#[test]
fn test_size_query_is_deterministic() {
    let request = [
        Dimension::new(30),
        Dimension::with_blocks(7, 7, 2),
        Dimension::new(5),
    ];
    let first = DistributionSurvey::survey(&request, 3, 6, None, DistFlags::NONE).unwrap();
    let second = DistributionSurvey::survey(&request, 3, 6, None, DistFlags::NONE).unwrap();
    assert_eq!(first, second);

    for pe in 0..6 {
        let direct = estimate(&request, 3, pe, 6, None, DistFlags::NONE).unwrap();
        assert_eq!(first.rank(pe), Some(&direct));
    }
}

/// Per-rank windows tile the global array on both sides
#[test]
fn test_layouts_tile_global_array() {
    let cases: Vec<(Vec<Dimension>, usize, Option<Sign>)> = vec![
        (dims(&[12, 8]), 4, None),
        (dims(&[5, 9, 3]), 7, None),
        (dims(&[3, 10]), 8, None),
        (dims(&[64]), 8, Some(Sign::Backward)),
        (vec![Dimension::new(4), Dimension::with_blocks(6, 6, 3)], 4, None),
    ];

    for (request, n_pes, sign) in cases {
        let survey = DistributionSurvey::survey(&request, 1, n_pes, sign, DistFlags::NONE).unwrap();
        for kind in BlockKind::ALL {
            survey.verify_tiling(kind).unwrap();
        }
        assert_covers_local(&survey);
    }
}

/// More processes than rows leaves the trailing ranks idle
#[test]
fn test_idle_ranks() {
    let survey = DistributionSurvey::survey(&dims(&[3, 5]), 1, 7, None, DistFlags::NONE).unwrap();
    let idle = survey.idle_ranks(BlockKind::Input);
    assert_eq!(idle, vec![6]);
    for pe in &idle {
        assert!(survey.rank(*pe).unwrap().input.is_empty());
    }
    survey.verify_tiling(BlockKind::Input).unwrap();
}

/// Plans never need more local storage than the size query reported
#[test]
fn test_plan_fits_in_reported_size() {
    // rank 2 slab
    let needs = run_group(4, |g| {
        let required = local_size_2d(12, 8, g).unwrap().required;
        let mut data = complex_zeros(required);
        let plan = PlanningContext::new()
            .plan_dft_2d(12, 8, Buffers::InPlace(&mut data), g, Sign::Forward, DistFlags::NONE)
            .unwrap();
        (required, plan.buffer_need(), plan.solver())
    });
    for (required, need, _) in &needs {
        assert!(need <= required, "need {} exceeds {}", need, required);
    }

    // rank 3 slab
    let needs = run_group(4, |g| {
        let required = local_size_3d(8, 6, 4, g).unwrap().required;
        let mut data = complex_zeros(required);
        let plan = PlanningContext::new()
            .plan_dft_3d(8, 6, 4, Buffers::InPlace(&mut data), g, Sign::Backward, DistFlags::NONE)
            .unwrap();
        (required, plan.buffer_need())
    });
    for (required, need) in needs {
        assert!(need <= required);
    }

    // rank 1 split by a radix
    let needs = run_group(4, |g| {
        let required = local_size_1d(16, g, Sign::Forward, DistFlags::NONE)
            .unwrap()
            .required;
        let input = complex_zeros(required);
        let mut output = complex_zeros(required);
        let plan = PlanningContext::new()
            .plan_dft_1d(
                16,
                Buffers::OutOfPlace {
                    input: &input,
                    output: &mut output,
                },
                g,
                Sign::Forward,
                DistFlags::NONE,
            )
            .unwrap();
        (required, plan.buffer_need(), plan.solver())
    });
    for (required, need, solver) in needs {
        assert_eq!(solver, "dft-rank1");
        assert!(need <= required);
    }

    // rank 1 with a batch at least as large as the group
    let needs = run_group(4, |g| {
        let required = local_size_many_1d(10, 8, g, Sign::Forward, DistFlags::NONE)
            .unwrap()
            .required;
        let mut data = complex_zeros(required);
        let plan = PlanningContext::new()
            .plan_many_dft(
                &[10],
                8,
                DEFAULT_BLOCK,
                DEFAULT_BLOCK,
                Buffers::InPlace(&mut data),
                g,
                Sign::Forward,
                DistFlags::NONE,
            )
            .unwrap();
        (required, plan.buffer_need(), plan.solver())
    });
    for (required, need, solver) in needs {
        assert_eq!(required, 24);
        assert_eq!(solver, "dft-rank1-bigvec");
        assert!(need <= required);
    }
}

/// Transposed flags route the block hints to the second dimension
#[test]
fn test_plan_many_dft_routes_transposed_hints() {
    // (flags, iblock, oblock, dim 0 blocks, dim 1 blocks) as [input, output]
    let cases = [
        (DistFlags::TRANSPOSED_OUT, 2, 3, [2, 8], [12, 3]),
        (DistFlags::TRANSPOSED_IN, 3, 2, [8, 2], [3, 12]),
        (
            DistFlags::TRANSPOSED_IN | DistFlags::TRANSPOSED_OUT,
            3,
            3,
            [8, 8],
            [3, 3],
        ),
    ];

    for (flags, iblock, oblock, dim0, dim1) in cases {
        let layouts = run_group(4, |g| {
            let mut data = complex_zeros(96);
            let plan = PlanningContext::new()
                .plan_many_dft(
                    &[8, 12],
                    1,
                    iblock,
                    oblock,
                    Buffers::InPlace(&mut data),
                    g,
                    Sign::Forward,
                    flags,
                )
                .unwrap();
            match plan.problem() {
                Problem::Dft(d) => {
                    assert_eq!(d.flags, flags);
                    [d.dist.dim(0).block, d.dist.dim(1).block]
                }
                other => panic!("unexpected problem {:?}", other),
            }
        });
        for blocks in layouts {
            assert_eq!(blocks, [dim0, dim1], "{:?}", flags);
        }
    }
}

/// Scrambled one-dimensional layouts tile, and their plans fit the size query
#[test]
fn test_scrambled_rank1_over_group() {
    // (flags, [input block, output block], required per rank)
    let cases = [
        (DistFlags::NONE, [8, 6], [8, 8, 8, 8]),
        (DistFlags::SCRAMBLED_IN, [6, 6], [8, 8, 8, 8]),
        (DistFlags::SCRAMBLED_OUT, [6, 6], [8, 8, 8, 8]),
        (
            DistFlags::SCRAMBLED_IN | DistFlags::SCRAMBLED_OUT,
            [6, 8],
            [8, 8, 8, 6],
        ),
    ];

    for (flags, block, expected) in cases {
        let survey =
            DistributionSurvey::survey(&dims(&[24]), 1, 4, Some(Sign::Forward), flags).unwrap();
        for kind in BlockKind::ALL {
            survey.verify_tiling(kind).unwrap();
        }
        assert_covers_local(&survey);

        let results = run_group(4, |g| {
            let required = local_size_many_1d(24, 1, g, Sign::Forward, flags)
                .unwrap()
                .required;
            let input = complex_zeros(required);
            let mut output = complex_zeros(required);
            let plan = PlanningContext::new()
                .plan_dft_1d(
                    24,
                    Buffers::OutOfPlace {
                        input: &input,
                        output: &mut output,
                    },
                    g,
                    Sign::Forward,
                    flags,
                )
                .unwrap();
            let resolved = match plan.problem() {
                Problem::Dft(d) => d.dist.dim(0).block,
                other => panic!("unexpected problem {:?}", other),
            };
            (required, plan.buffer_need(), plan.solver(), resolved)
        });

        for (pe, (required, need, solver, resolved)) in results.into_iter().enumerate() {
            assert_eq!(required, expected[pe], "{:?} rank {}", flags, pe);
            assert_eq!(survey.rank(pe).unwrap().required, required);
            assert_eq!(resolved, block, "{:?}", flags);
            assert_eq!(solver, "dft-rank1");
            assert!(
                need <= required,
                "{:?} rank {}: need {} exceeds {}",
                flags,
                pe,
                need,
                required
            );
        }
    }
}

/// Every member of the group picks the same algorithm
#[test]
fn test_group_agrees_on_algorithm() {
    for rigor in [PlanRigor::Measure, PlanRigor::Patient] {
        let chosen = run_group(4, |g| {
            let config = ConfigBuilder::new().rigor(rigor).build().unwrap();
            let mut ctx = PlanningContext::with_config(config);
            let required = local_size_2d(12, 8, g).unwrap().required;
            let mut data = complex_zeros(required);
            let plan = ctx
                .plan_dft_2d(12, 8, Buffers::InPlace(&mut data), g, Sign::Forward, DistFlags::NONE)
                .unwrap();
            (plan.solver(), plan.cost(), g.completed_reductions())
        });

        let names: HashSet<_> = chosen.iter().map(|(name, _, _)| *name).collect();
        assert_eq!(names.len(), 1, "ranks disagree under {:?}: {:?}", rigor, chosen);
        let costs: HashSet<_> = chosen.iter().map(|(_, cost, _)| cost.to_bits()).collect();
        assert_eq!(costs.len(), 1);
        // one collective per applicable slab variant
        for (_, _, reductions) in &chosen {
            assert_eq!(*reductions, 2);
        }
    }
}

/// Transposes agree too, including the patient-only variant
#[test]
fn test_transpose_over_group() {
    let chosen = run_group(4, |g| {
        let config = ConfigBuilder::new().rigor(PlanRigor::Patient).build().unwrap();
        let mut ctx = PlanningContext::with_config(config);
        let mut data = real_zeros(12);
        let plan = ctx
            .plan_transpose(8, 6, Buffers::InPlace(&mut data), g, DistFlags::NONE)
            .unwrap();
        let (input, output) = match plan.problem() {
            Problem::Transpose(t) => (t.local_input(), t.local_output()),
            other => panic!("unexpected problem {:?}", other),
        };
        (plan.solver(), plan.buffer_need(), input, output)
    });

    let names: HashSet<_> = chosen.iter().map(|c| c.0).collect();
    assert_eq!(names.len(), 1);
    assert_eq!(chosen[0].2, 12);
    assert_eq!(chosen[3].3, 0);
    for (_, need, input, output) in chosen {
        assert_eq!(need, input.max(output));
    }
}

/// Estimate rigor takes the first applicable algorithm without communicating
#[test]
fn test_estimate_rigor_is_silent() {
    let chosen = run_group(3, |g| {
        let config = ConfigBuilder::new().rigor(PlanRigor::Estimate).build().unwrap();
        let mut ctx = PlanningContext::with_config(config);
        let mut data = complex_zeros(64);
        let plan = ctx
            .plan_dft_2d(9, 7, Buffers::InPlace(&mut data), g, Sign::Forward, DistFlags::NONE)
            .unwrap();
        (plan.solver(), g.completed_reductions())
    });
    for (solver, reductions) in chosen {
        assert_eq!(solver, "dft-rank-geq2");
        assert_eq!(reductions, 0);
    }
}

/// Layouts split over several dimensions have no algorithm
#[test]
fn test_multi_dimensional_split_is_declined() {
    let request = [Dimension::with_blocks(4, 2, 2), Dimension::with_blocks(4, 2, 2)];
    let results = run_group(4, |g| {
        let size = local_size_guru(&request, 1, g, None, DistFlags::NONE).unwrap();
        let mut data = complex_zeros(size.required);
        let err = PlanningContext::new()
            .plan_guru_dft(&request, 1, Buffers::InPlace(&mut data), g, Sign::Forward, DistFlags::NONE)
            .unwrap_err();
        (size, err)
    });
    for (size, err) in results {
        assert_eq!(size.required, 4);
        assert!(matches!(err, DistError::PlannerDeclined { family: "dft" }));
    }
}

/// Hints that need more blocks than processes are rejected on every rank
#[test]
fn test_infeasible_hints() {
    let request = [Dimension::with_blocks(12, 2, DEFAULT_BLOCK), Dimension::new(8)];
    let results = run_group(4, |g| local_size_guru(&request, 1, g, None, DistFlags::NONE));
    for result in results {
        let err = result.unwrap_err();
        assert!(err.is_infeasible());
        assert!(matches!(
            err,
            DistError::InfeasibleDistribution {
                kind: BlockKind::Input,
                required: 6,
                available: 4
            }
        ));
    }
}

/// Contexts can be shut down and initialized again
#[test]
fn test_context_lifecycle() {
    let group = SingleProcessGroup;
    let mut ctx = PlanningContext::new();
    assert!(!ctx.is_initialized());

    let mut data = complex_zeros(16);
    let plan = ctx
        .plan_dft_1d(16, Buffers::InPlace(&mut data), &group, Sign::Forward, DistFlags::NONE)
        .unwrap();
    assert_eq!(plan.solver(), "dft-serial");
    assert!(ctx.is_initialized());

    ctx.shutdown();
    assert!(!ctx.is_initialized());
    assert!(ctx.planner().solver_names().is_empty());

    let mut data = complex_zeros(16);
    let plan = ctx
        .plan_dft_1d(16, Buffers::InPlace(&mut data), &group, Sign::Backward, DistFlags::NONE)
        .unwrap();
    assert_eq!(plan.solver(), "dft-serial");
    assert!(ctx.is_initialized());
}

/// A configuration file drives the planning context
#[test]
fn test_config_file_integration() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(DEFAULT_CONFIG_FILE);

    let config = ConfigBuilder::new()
        .rigor(PlanRigor::Patient)
        .cost_kind(CostKind::Sum)
        .survey_layouts(true)
        .max_survey_elements(1 << 10)
        .build()
        .unwrap();
    config.save_to_file(&path).unwrap();

    let loaded = PlannerConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);

    let mut ctx = PlanningContext::with_config(loaded);
    assert_eq!(ctx.planner().cost_kind(), CostKind::Sum);

    let group = SingleProcessGroup;
    let mut data = complex_zeros(60);
    let plan = ctx
        .plan_dft_3d(3, 4, 5, Buffers::InPlace(&mut data), &group, Sign::Forward, DistFlags::NONE)
        .unwrap();
    assert_eq!(plan.buffer_need(), 60);
    assert_eq!(ctx.config().rigor, PlanRigor::Patient);
}

/// Scalars and empty batches
#[test]
fn test_degenerate_requests() {
    let group = SingleProcessGroup;
    let scalar = local_size_guru(&[], 5, &group, None, DistFlags::NONE).unwrap();
    assert_eq!(scalar.required, 5);

    let slab = local_size_many(&[], 5, DEFAULT_BLOCK, &group).unwrap();
    assert_eq!(slab.required, 5);

    let empty = local_size_guru(&dims(&[6, 6]), 0, &group, None, DistFlags::NONE).unwrap();
    assert_eq!(empty.required, 0);

    let err = local_size_guru(&dims(&[6]), 1, &group, None, DistFlags::SCRAMBLED_IN).unwrap_err();
    assert!(matches!(err, DistError::InvalidRequest { .. }));
}
