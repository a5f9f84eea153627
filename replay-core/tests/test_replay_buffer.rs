use anyhow::Result;
use ndarray::{arr1, ArrayD};
use replay_core::{
    ArrayBatch, EpisodeKey, EpisodicConfig, ExperienceBufferBase, MultiArrayBatch,
    PerConfig, ReplayBuffer, ReplayBufferBase, ReplayBufferConfig,
    ReplayBufferError, SampleIndex, Transition,
};

type Buffer = ReplayBuffer<Vec<f32>, Vec<i64>>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn transition(t: usize, reward: f32, is_done: bool) -> Transition<f32, i64> {
    Transition::new(t as f32, t as i64, reward, t as f32 + 1.0, is_done)
}

fn error_of(err: &anyhow::Error) -> &ReplayBufferError {
    err.downcast_ref::<ReplayBufferError>()
        .expect("expected a ReplayBufferError")
}

fn per_buffer(capacity: usize) -> Result<Buffer> {
    let config = ReplayBufferConfig::default()
        .capacity(capacity)
        .per_config(Some(PerConfig::default().alpha(1.0)));
    Buffer::build(&config)
}

#[test]
fn test_len_grows_until_capacity() -> Result<()> {
    init_logger();
    let mut buffer = Buffer::build(&ReplayBufferConfig::default().capacity(5))?;
    assert!(buffer.is_empty());

    for t in 0..5 {
        let ix = buffer.push(transition(t, 0.0, false))?;
        assert_eq!(ix.ix, t);
        assert_eq!(buffer.len(), t + 1);
    }
    assert!(buffer.is_full());
    assert!(buffer.can_sample(5));
    assert!(!buffer.can_sample(6));

    for t in 5..12 {
        buffer.push(transition(t, 0.0, false))?;
        assert_eq!(buffer.len(), 5);
    }

    // Only the last five transitions survive.
    let batch = buffer.batch(500)?;
    assert_eq!(batch.len(), 500);
    assert!(batch.obs.iter().all(|&o| o >= 7.0 && o <= 11.0));
    assert!(batch.weight.is_none());
    assert!(batch.ix_sample.is_none());
    Ok(())
}

#[test]
fn test_uniform_batch_columns_match() -> Result<()> {
    let mut buffer = Buffer::build(&ReplayBufferConfig::default().capacity(10))?;
    for t in 0..10 {
        buffer.push(transition(t, t as f32 * 0.5, t % 3 == 0))?;
    }
    assert_eq!(buffer.num_done_flags(), 4);
    assert_eq!(buffer.sum_rewards(), 22.5);

    let batch = buffer.batch(100)?;
    assert_eq!(batch.obs().len(), 100);
    assert_eq!(batch.act().len(), 100);
    for i in 0..batch.len() {
        let t = batch.obs[i];
        assert_eq!(batch.act[i], t as i64);
        assert_eq!(batch.next_obs[i], t + 1.0);
        assert_eq!(batch.reward[i], t * 0.5);
        assert_eq!(batch.is_done[i], ((t as usize) % 3 == 0) as i8);
    }
    Ok(())
}

#[test]
fn test_sample_from_empty_buffer() -> Result<()> {
    let mut buffer = Buffer::build(&ReplayBufferConfig::default())?;
    let err = buffer.batch(1).unwrap_err();
    assert_eq!(error_of(&err), &ReplayBufferError::EmptyBuffer);

    let mut buffer = per_buffer(4)?;
    let err = buffer.batch_with_beta(1, 0.5).unwrap_err();
    assert_eq!(error_of(&err), &ReplayBufferError::EmptyBuffer);
    Ok(())
}

#[test]
fn test_zero_capacity() {
    let err = Buffer::build(&ReplayBufferConfig::default().capacity(0))
        .err()
        .unwrap();
    assert_eq!(error_of(&err), &ReplayBufferError::Capacity(0));
}

#[test]
fn test_beta_must_be_positive() -> Result<()> {
    let mut buffer = per_buffer(4)?;
    buffer.push(transition(0, 0.0, false))?;
    for beta in [0.0, -1.0].iter() {
        let err = buffer.batch_with_beta(1, *beta).unwrap_err();
        assert_eq!(error_of(&err), &ReplayBufferError::BetaRange(*beta));
    }
    Ok(())
}

#[test]
fn test_wrapped_slot_takes_new_priority() -> Result<()> {
    init_logger();
    let mut buffer = per_buffer(4)?;
    for (t, p) in [1f32, 2.0, 3.0, 4.0, 5.0].iter().enumerate() {
        let ix = buffer.push(transition(t, 0.0, false))?;
        buffer.update_priority(&[ix], &[*p])?;
    }

    let sum_tree = buffer.sum_tree().unwrap();
    assert_eq!(sum_tree.get(0), 5.0);
    assert_eq!(sum_tree.total(), 14.0);
    assert_eq!(buffer.min_tree().unwrap().minimum(), 2.0);
    Ok(())
}

#[test]
fn test_new_transitions_get_max_priority() -> Result<()> {
    let mut buffer = per_buffer(4)?;
    let a = buffer.push(transition(0, 0.0, false))?;
    assert_eq!(buffer.sum_tree().unwrap().get(a.ix), 1.0);

    buffer.update_priority(&[a], &[10.0])?;
    assert_eq!(buffer.max_priority(), Some(9.5));

    let b = buffer.push(transition(1, 0.0, false))?;
    assert_eq!(buffer.sum_tree().unwrap().get(b.ix), 9.5);
    Ok(())
}

#[test]
fn test_proportional_sampling_frequency() -> Result<()> {
    let mut buffer = per_buffer(4)?;
    let ixs = (0..4)
        .map(|t| buffer.push(transition(t, 0.0, false)))
        .collect::<Result<Vec<_>>>()?;
    buffer.update_priority(&ixs, &[1.0, 2.0, 3.0, 4.0])?;

    let n = 40_000;
    let batch = buffer.batch_with_beta(n, 1.0)?;
    let mut counts = [0usize; 4];
    for ix in batch.ix_sample.as_ref().unwrap().iter() {
        counts[ix.ix] += 1;
    }
    for (i, &c) in counts.iter().enumerate() {
        let expected = (i + 1) as f32 / 10.0;
        let freq = c as f32 / n as f32;
        assert!(
            (freq - expected).abs() < 0.015,
            "slot {}: {} vs {}",
            i,
            freq,
            expected
        );
    }
    Ok(())
}

#[test]
fn test_importance_weights() -> Result<()> {
    let mut buffer = per_buffer(8)?;
    let ixs = (0..4)
        .map(|t| buffer.push(transition(t, 0.0, false)))
        .collect::<Result<Vec<_>>>()?;
    buffer.update_priority(&ixs, &[1.0, 2.0, 4.0, 8.0])?;

    let batch = buffer.batch_with_beta(2000, 1.0)?;
    let weight = batch.weight.unwrap();
    let ix_sample = batch.ix_sample.unwrap();
    assert!(weight.iter().all(|&w| w > 0.0 && w <= 1.0 + 1e-6));

    // The minimum-priority slot is sampled with near certainty in 2000 draws.
    assert!(ix_sample.iter().any(|ix| ix.ix == 0));
    let max_w = weight.iter().cloned().fold(0f32, f32::max);
    assert!((max_w - 1.0).abs() < 1e-6);

    for (ix, w) in ix_sample.iter().zip(weight.iter()) {
        let expected = 1.0 / 2f32.powi(ix.ix as i32);
        assert!((w - expected).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn test_alpha_zero_is_uniform() -> Result<()> {
    let config = ReplayBufferConfig::default()
        .capacity(4)
        .per_config(Some(PerConfig::default().alpha(0.0)));
    let mut buffer = Buffer::build(&config)?;
    let ixs = (0..4)
        .map(|t| buffer.push(transition(t, 0.0, false)))
        .collect::<Result<Vec<_>>>()?;
    buffer.update_priority(&ixs, &[1.0, 10.0, 100.0, 1000.0])?;

    let batch = buffer.batch_with_beta(100, 0.5)?;
    assert!(batch.weight.unwrap().iter().all(|&w| (w - 1.0).abs() < 1e-6));
    Ok(())
}

#[test]
fn test_update_priority_is_idempotent() -> Result<()> {
    let mut buffer = per_buffer(4)?;
    let ixs = (0..4)
        .map(|t| buffer.push(transition(t, 0.0, false)))
        .collect::<Result<Vec<_>>>()?;

    buffer.update_priority(&[ixs[2]], &[0.3])?;
    let leaves = (0..4)
        .map(|i| buffer.sum_tree().unwrap().get(i))
        .collect::<Vec<_>>();
    let total = buffer.sum_tree().unwrap().total();
    let minimum = buffer.min_tree().unwrap().minimum();

    buffer.update_priority(&[ixs[2]], &[0.3])?;
    let leaves_ = (0..4)
        .map(|i| buffer.sum_tree().unwrap().get(i))
        .collect::<Vec<_>>();
    assert_eq!(leaves, leaves_);
    assert_eq!(total, buffer.sum_tree().unwrap().total());
    assert_eq!(minimum, buffer.min_tree().unwrap().minimum());
    Ok(())
}

#[test]
fn test_invalid_priority_updates_change_nothing() -> Result<()> {
    let mut buffer = per_buffer(4)?;
    let ixs = (0..2)
        .map(|t| buffer.push(transition(t, 0.0, false)))
        .collect::<Result<Vec<_>>>()?;
    let total = buffer.sum_tree().unwrap().total();
    let max_priority = buffer.max_priority();

    let err = buffer.update_priority(&ixs, &[1.0]).unwrap_err();
    assert!(matches!(error_of(&err), ReplayBufferError::InvalidPriority(_)));

    let err = buffer.update_priority(&ixs, &[2.0, 0.0]).unwrap_err();
    assert!(matches!(error_of(&err), ReplayBufferError::InvalidPriority(_)));

    let err = buffer.update_priority(&ixs, &[2.0, -1.0]).unwrap_err();
    assert!(matches!(error_of(&err), ReplayBufferError::InvalidPriority(_)));

    let out_of_range = SampleIndex {
        ix: 3,
        generation: 1,
    };
    let err = buffer
        .update_priority(&[ixs[0], out_of_range], &[2.0, 2.0])
        .unwrap_err();
    assert_eq!(
        error_of(&err),
        &ReplayBufferError::IndexRange { ix: 3, len: 2 }
    );

    assert_eq!(buffer.sum_tree().unwrap().total(), total);
    assert_eq!(buffer.max_priority(), max_priority);
    Ok(())
}

#[test]
fn test_priorities_outside_tree_range_are_rejected() -> Result<()> {
    let config = ReplayBufferConfig::default()
        .capacity(4)
        .per_config(Some(PerConfig::default().alpha(2.0)));
    let mut buffer = Buffer::build(&config)?;
    let a = buffer.push(transition(0, 0.0, false))?;
    buffer.push(transition(1, 0.0, false))?;
    let total = buffer.sum_tree().unwrap().total();

    // 1e-25^2 underflows to zero, 1e20^2 overflows.
    for p in [1e-25f32, 1e20].iter() {
        let err = buffer.update_priority(&[a], &[*p]).unwrap_err();
        assert!(matches!(error_of(&err), ReplayBufferError::InvalidPriority(_)));
    }
    assert_eq!(buffer.sum_tree().unwrap().total(), total);
    assert!(buffer.min_tree().unwrap().minimum() > 0.0);

    let batch = buffer.batch_with_beta(8, 1.0)?;
    assert!(batch.weight.unwrap().iter().all(|&w| w > 0.0 && w <= 1.0));
    Ok(())
}

#[test]
fn test_weights_stay_in_unit_interval_for_distant_priorities() -> Result<()> {
    let config = ReplayBufferConfig::default()
        .capacity(4)
        .per_config(Some(PerConfig::default().alpha(2.0)));
    let mut buffer = Buffer::build(&config)?;
    let ixs = (0..2)
        .map(|t| buffer.push(transition(t, 0.0, false)))
        .collect::<Result<Vec<_>>>()?;
    buffer.update_priority(&ixs, &[1e-15, 1e15])?;

    let batch = buffer.batch_with_beta(64, 1.0)?;
    let weight = batch.weight.unwrap();
    for (ix, w) in batch.ix_sample.unwrap().iter().zip(weight.iter()) {
        assert!(*w > 0.0 && *w <= 1.0, "slot {}: {}", ix.ix, w);
        assert!(w.is_finite());
    }
    Ok(())
}

#[test]
fn test_stale_index_is_rejected() -> Result<()> {
    let mut buffer = per_buffer(2)?;
    buffer.push(transition(0, 0.0, false))?;
    buffer.push(transition(1, 0.0, false))?;
    let batch = buffer.batch_with_beta(2, 0.4)?;
    let ixs = batch.ix_sample.unwrap();

    // Both slots are overwritten before the priorities come back.
    buffer.push(transition(2, 0.0, false))?;
    buffer.push(transition(3, 0.0, false))?;
    let total = buffer.sum_tree().unwrap().total();

    let err = buffer.update_priority(&ixs, &[5.0, 5.0]).unwrap_err();
    assert!(matches!(error_of(&err), ReplayBufferError::StaleIndex { .. }));
    assert_eq!(buffer.sum_tree().unwrap().total(), total);
    Ok(())
}

#[test]
fn test_beta_is_annealed_by_updates() -> Result<()> {
    let config = ReplayBufferConfig::default().capacity(4).per_config(Some(
        PerConfig::default()
            .beta_0(0.4)
            .beta_final(1.0)
            .n_opts_final(2),
    ));
    let mut buffer = Buffer::build(&config)?;
    let ix = buffer.push(transition(0, 0.0, false))?;
    assert_eq!(buffer.beta(), Some(0.4));
    buffer.update_priority(&[ix], &[1.0])?;
    assert!((buffer.beta().unwrap() - 0.7).abs() < 1e-6);
    buffer.update_priority(&[ix], &[1.0])?;
    assert_eq!(buffer.beta(), Some(1.0));

    let batch = buffer.batch(3)?;
    assert_eq!(batch.weight.map(|w| w.len()), Some(3));
    Ok(())
}

#[test]
fn test_uniform_buffer_validates_updates() -> Result<()> {
    let mut buffer = Buffer::build(&ReplayBufferConfig::default().capacity(2))?;
    let ix = buffer.push(transition(0, 0.0, false))?;
    buffer.update_priority(&[ix], &[1.0])?;
    assert!(buffer.max_priority().is_none());

    let err = buffer.update_priority(&[ix], &[0.0]).unwrap_err();
    assert!(matches!(error_of(&err), ReplayBufferError::InvalidPriority(_)));
    Ok(())
}

fn episodic_config(capacity: usize, n_step: usize, gamma: f32) -> ReplayBufferConfig {
    ReplayBufferConfig::default().capacity(capacity).episodic_config(Some(
        EpisodicConfig::default().n_step(n_step).gamma(gamma),
    ))
}

fn push_episode(buffer: &mut Buffer, ts: std::ops::Range<usize>, worker: usize) -> Result<()> {
    let last = ts.end - 1;
    for t in ts {
        let is_done = t == last;
        buffer.push(transition(t, 1.0, is_done).with_episode(worker, is_done))?;
    }
    Ok(())
}

#[test]
fn test_n_step_folding() -> Result<()> {
    init_logger();
    let mut buffer = Buffer::build(&episodic_config(10, 3, 0.5))?;
    push_episode(&mut buffer, 0..4, 0)?;

    let batch = buffer.batch(400)?;
    let mut seen = [false; 4];
    for i in 0..batch.len() {
        let t = batch.obs[i] as usize;
        seen[t] = true;
        let (reward, next_obs, is_done) = match t {
            0 => (1.75, 3.0, 0),
            1 => (1.75, 4.0, 1),
            2 => (1.5, 4.0, 1),
            _ => (1.0, 4.0, 1),
        };
        assert_eq!(batch.reward[i], reward);
        assert_eq!(batch.next_obs[i], next_obs);
        assert_eq!(batch.is_done[i], is_done);
        assert_eq!(batch.act[i], t as i64);
    }
    assert!(seen.iter().all(|&s| s));
    Ok(())
}

#[test]
fn test_n_step_does_not_cross_episodes() -> Result<()> {
    let mut buffer = Buffer::build(&episodic_config(10, 5, 1.0))?;
    push_episode(&mut buffer, 0..2, 0)?;
    push_episode(&mut buffer, 2..5, 0)?;

    let batch = buffer.batch(300)?;
    for i in 0..batch.len() {
        let expected = match batch.obs[i] as usize {
            0 => 2.0,
            1 => 1.0,
            2 => 3.0,
            3 => 2.0,
            _ => 1.0,
        };
        assert_eq!(batch.reward[i], expected);
    }
    Ok(())
}

#[test]
fn test_interleaved_workers() -> Result<()> {
    let config = ReplayBufferConfig::default().capacity(10).episodic_config(Some(
        EpisodicConfig::default()
            .n_step(2)
            .gamma(1.0)
            .worker_size(2),
    ));
    let mut buffer = Buffer::build(&config)?;
    // Worker 0: t = 0, 2 (terminal); worker 1: t = 1, 3 (terminal)
    for t in 0..4 {
        let terminal = t >= 2;
        buffer.push(transition(t, t as f32, terminal).with_episode(t % 2, terminal))?;
    }
    assert_eq!(
        buffer.episode_keys(),
        vec![
            EpisodeKey {
                worker: 0,
                episode: 0
            },
            EpisodeKey {
                worker: 1,
                episode: 0
            }
        ]
    );

    let batch = buffer.batch(200)?;
    for i in 0..batch.len() {
        let (reward, next_obs) = match batch.obs[i] as usize {
            0 => (2.0, 3.0),
            1 => (4.0, 4.0),
            2 => (2.0, 3.0),
            _ => (3.0, 4.0),
        };
        assert_eq!(batch.reward[i], reward);
        assert_eq!(batch.next_obs[i], next_obs);
    }

    let err = buffer
        .push(transition(4, 0.0, false).with_episode(2, false))
        .unwrap_err();
    assert_eq!(
        error_of(&err),
        &ReplayBufferError::InvalidWorker {
            worker: 2,
            worker_size: 2
        }
    );
    assert_eq!(buffer.len(), 4);
    Ok(())
}

#[test]
fn test_episode_removed_with_terminal_slot() -> Result<()> {
    let mut buffer = Buffer::build(&episodic_config(3, 3, 0.9))?;
    push_episode(&mut buffer, 0..2, 0)?;
    buffer.push(transition(2, 1.0, false))?;

    let first = EpisodeKey {
        worker: 0,
        episode: 0,
    };
    let second = EpisodeKey {
        worker: 0,
        episode: 1,
    };
    assert_eq!(buffer.episode_keys(), vec![first, second]);

    buffer.push(transition(3, 1.0, false))?;
    assert_eq!(buffer.episode_slots(&first), Some(vec![1]));

    buffer.push(transition(4, 1.0, false))?;
    assert_eq!(buffer.episode_keys(), vec![second]);
    assert_eq!(buffer.episode_slots(&second), Some(vec![2, 0, 1]));

    // Folding never reads evicted slots.
    let batch = buffer.batch(100)?;
    for i in 0..batch.len() {
        assert!(batch.obs[i] >= 2.0);
        assert!(batch.next_obs[i] >= 3.0);
    }
    Ok(())
}

#[test]
fn test_prioritized_n_step() -> Result<()> {
    let config = episodic_config(8, 3, 0.5).per_config(Some(PerConfig::default().alpha(1.0)));
    let mut buffer = Buffer::build(&config)?;
    push_episode(&mut buffer, 0..4, 0)?;
    assert!(buffer.is_prioritized() && buffer.is_episodic());

    let batch = buffer.batch_with_beta(200, 0.5)?;
    let ixs = batch.ix_sample.clone().unwrap();
    for i in 0..batch.len() {
        if batch.obs[i] == 0.0 {
            assert_eq!(batch.reward[i], 1.75);
            assert_eq!(batch.next_obs[i], 3.0);
        }
    }
    // Equal priorities give equal weights.
    assert!(batch.weight.unwrap().iter().all(|&w| (w - 1.0).abs() < 1e-6));

    let priorities = ixs.iter().map(|ix| 1.0 + ix.ix as f32).collect::<Vec<_>>();
    buffer.update_priority(&ixs, &priorities)?;
    let batch = buffer.batch_with_beta(200, 0.5)?;
    assert!(batch.weight.unwrap().iter().all(|&w| w > 0.0 && w <= 1.0 + 1e-6));
    Ok(())
}

#[test]
fn test_untagged_transitions_use_done_flag() -> Result<()> {
    let mut buffer = Buffer::build(&episodic_config(10, 4, 1.0))?;
    for t in 0..5 {
        buffer.push(transition(t, 1.0, t == 1))?;
    }
    assert_eq!(
        buffer.episode_keys(),
        vec![
            EpisodeKey {
                worker: 0,
                episode: 0
            },
            EpisodeKey {
                worker: 0,
                episode: 1
            }
        ]
    );
    Ok(())
}

#[test]
fn test_array_observations_are_copied() -> Result<()> {
    let config = ReplayBufferConfig::default().capacity(2);
    let mut buffer = ReplayBuffer::<ArrayBatch, Vec<i64>>::build(&config)?;
    let obs = |v: f32| -> ArrayD<f32> { arr1(&[v, v]).into_dyn() };
    buffer.push(Transition::new(obs(1.0), 0, 0.0, obs(2.0), false))?;

    let batch = buffer.batch(3)?;
    let expected = ndarray::arr2(&[[1f32, 1.0], [1.0, 1.0], [1.0, 1.0]]).into_dyn();
    assert_eq!(batch.obs.array(), Some(&expected));

    // Mutating a sampled batch leaves the buffer intact.
    let (obs_, _, _, _, _, _, _) = batch.unpack();
    let mut arr = obs_.into_array().unwrap();
    arr.fill(-1.0);

    let batch = buffer.batch(1)?;
    assert_eq!(
        batch.obs.into_array(),
        Some(ndarray::arr2(&[[1f32, 1.0]]).into_dyn())
    );
    Ok(())
}

#[test]
fn test_multi_modal_observations() -> Result<()> {
    let config = ReplayBufferConfig::default().capacity(4);
    let mut buffer = ReplayBuffer::<MultiArrayBatch, Vec<i64>>::build(&config)?;
    for t in 0..4 {
        let v = t as f32;
        let obs = vec![arr1(&[v]).into_dyn(), arr1(&[v, v, v]).into_dyn()];
        let next_obs = vec![arr1(&[v + 1.0]).into_dyn(), arr1(&[v, v, v]).into_dyn()];
        buffer.push(Transition::new(obs, t as i64, 0.0, next_obs, false))?;
    }

    let batch = buffer.batch(16)?;
    let act = batch.act.clone();
    let obs = batch.obs.into_arrays();
    let next_obs = batch.next_obs.into_arrays();
    assert_eq!(obs.len(), 2);
    assert_eq!(obs[0].shape(), &[16, 1]);
    assert_eq!(obs[1].shape(), &[16, 3]);
    for (i, &a) in act.iter().enumerate() {
        assert_eq!(obs[0][&[i, 0][..]], a as f32);
        assert_eq!(obs[1][&[i, 2][..]], a as f32);
        assert_eq!(next_obs[0][&[i, 0][..]], a as f32 + 1.0);
    }
    Ok(())
}
