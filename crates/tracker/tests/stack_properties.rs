use phasetrack_tracker::{
    BlockPhaseState, PhaseContext, PhaseStack, PhaseState, PlayerState, SpawningState, TickState,
    TrackerConfig, TrackerError, WorldGenState,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push(PhaseState),
    Pop,
}

fn any_pushable_state() -> impl Strategy<Value = PhaseState> {
    prop_oneof![
        Just(PhaseState::Block(BlockPhaseState::PostNotificationEvent)),
        Just(PhaseState::Block(BlockPhaseState::RestoringBlocks)),
        Just(PhaseState::Spawning(SpawningState::ChunkSpawning)),
        Just(PhaseState::Spawning(SpawningState::DropItem)),
        Just(PhaseState::World(WorldGenState::TerrainGeneration)),
        Just(PhaseState::Tick(TickState::TickingEntity)),
        Just(PhaseState::Player(PlayerState::BreakBlock)),
    ]
}

fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any_pushable_state().prop_map(Op::Push),
        Just(Op::Pop),
    ]
}

proptest! {
    #[test]
    fn sentinel_survives_any_push_pop_sequence(ops in prop::collection::vec(any_op(), 0..64)) {
        let mut stack = PhaseStack::new(&TrackerConfig::default());
        let mut expected: Vec<PhaseState> = Vec::new();

        for op in ops {
            match op {
                Op::Push(state) => {
                    stack.push(state, PhaseContext::start().complete()).unwrap();
                    expected.push(state);
                }
                Op::Pop => match expected.pop() {
                    Some(state) => {
                        prop_assert_eq!(stack.pop().unwrap().state, state);
                    }
                    None => {
                        prop_assert!(matches!(stack.pop(), Err(TrackerError::EmptyStack)));
                    }
                },
            }
            prop_assert_eq!(stack.depth(), expected.len());
            prop_assert!(stack.len() >= 1);
            prop_assert_eq!(stack.current_states()[0], PhaseState::IDLE);
        }
    }
}
