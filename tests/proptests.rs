use proptest::prelude::*;

use evmlite::word;
use evmlite::{Config, Evm, EvmError, ExecutionResult, Memory, Storage};
use primitive_types::U256;

fn arb_word() -> impl Strategy<Value = U256> {
    proptest::array::uniform32(any::<u8>()).prop_map(|b| U256::from_big_endian(&b))
}

proptest! {
    #[test]
    fn add_is_commutative(a in arb_word(), b in arb_word()) {
        prop_assert_eq!(word::add(a, b), word::add(b, a));
    }

    #[test]
    fn add_zero_is_identity(a in arb_word()) {
        prop_assert_eq!(word::add(a, U256::zero()), a);
    }

    #[test]
    fn sub_undoes_add(a in arb_word(), b in arb_word()) {
        prop_assert_eq!(word::sub(word::add(a, b), b), a);
    }

    #[test]
    fn div_and_rem_by_zero_are_zero(a in arb_word()) {
        prop_assert_eq!(word::div(a, U256::zero()), U256::zero());
        prop_assert_eq!(word::rem(a, U256::zero()), U256::zero());
        prop_assert_eq!(word::sdiv(a, U256::zero()), U256::zero());
        prop_assert_eq!(word::smod(a, U256::zero()), U256::zero());
    }

    #[test]
    fn div_rem_reconstructs_dividend(a in arb_word(), b in arb_word()) {
        prop_assume!(!b.is_zero());
        let reconstructed = word::add(word::mul(word::div(a, b), b), word::rem(a, b));
        prop_assert_eq!(reconstructed, a);
    }

    #[test]
    fn neg_is_involutive(a in arb_word()) {
        prop_assert_eq!(word::neg(word::neg(a)), a);
    }

    #[test]
    fn memory_word_round_trip(value in arb_word(), offset in 0usize..4096) {
        let mut m = Memory::new();
        m.store_word(offset, value).unwrap();
        prop_assert_eq!(m.load_word(offset).unwrap(), value);
    }

    #[test]
    fn unwritten_memory_reads_zero(offset in 0usize..65536, len in 0usize..256) {
        let mut m = Memory::new();
        prop_assert!(m.slice(offset, len).unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn storage_round_trip(key in arb_word(), value in arb_word()) {
        let mut s = Storage::new();
        s.store(key, value);
        prop_assert_eq!(s.load(key), value);
    }

    #[test]
    fn calldataload_zero_pads(
        calldata in proptest::collection::vec(any::<u8>(), 0..64),
        offset in 0u8..96,
    ) {
        // PUSH1 offset; CALLDATALOAD; STOP
        let code = vec![0x60, offset, 0x35, 0x00];
        let mut evm = Evm::new(code, Config { calldata: calldata.clone(), ..Config::default() });
        evm.run();
        let mut expected = [0u8; 32];
        for (i, b) in expected.iter_mut().enumerate() {
            *b = calldata.get(offset as usize + i).copied().unwrap_or(0);
        }
        prop_assert_eq!(evm.stack.last(), Some(&U256::from_big_endian(&expected)));
    }

    #[test]
    fn binary_ops_underflow_with_one_operand(
        op in prop_oneof![
            Just(0x01u8), Just(0x02), Just(0x03), Just(0x04), Just(0x05),
            Just(0x06), Just(0x07), Just(0x0a), Just(0x10), Just(0x11),
            Just(0x12), Just(0x13), Just(0x14), Just(0x16), Just(0x17),
            Just(0x18),
        ],
    ) {
        // PUSH1 0x01; <op> with only one operand on the stack
        let code = vec![0x60, 0x01, op];
        let mut evm = Evm::new(code, Config::default());
        let result = evm.run();
        prop_assert_eq!(result, ExecutionResult::Failed {
            error: EvmError::StackUnderflow,
            pc: 2,
        });
    }

    #[test]
    fn jump_without_jumpdest_always_fails(dest in any::<u8>()) {
        // PUSH1 dest; JUMP -- this code contains no JUMPDEST instruction
        // (byte 1 is PUSH immediate data even when it equals 0x5b)
        let code = vec![0x60, dest, 0x56];
        let mut evm = Evm::new(code, Config::default());
        let result = evm.run();
        prop_assert_eq!(result, ExecutionResult::Failed {
            error: EvmError::InvalidJump(U256::from(dest)),
            pc: 2,
        });
    }

    #[test]
    fn sstore_sload_round_trips_through_the_vm(key in any::<u8>(), value in any::<u8>()) {
        // PUSH1 value; PUSH1 key; SSTORE; PUSH1 key; SLOAD; STOP
        let code = vec![0x60, value, 0x60, key, 0x55, 0x60, key, 0x54, 0x00];
        let mut evm = Evm::new(code, Config::default());
        let result = evm.run();
        prop_assert_eq!(result, ExecutionResult::Halted { output: vec![] });
        prop_assert_eq!(evm.stack.last(), Some(&U256::from(value)));
        prop_assert_eq!(evm.storage.load(U256::from(key)), U256::from(value));
    }
}
