use cellvm_core::{
    encode_program, Addr, Event, FaultKind, Instruction, OpCode, Reg, RunOutcome, ScriptedPorts,
    VirtualMachine, VmConfig, Word,
};

const REGS: [Reg; 8] = [
    Reg::R0, Reg::R1, Reg::R2, Reg::R3, Reg::R4, Reg::R5, Reg::R6, Reg::R7,
];

const SAMPLE_VALUES: [Word; 7] = [0, 1, -1, 42, -42, Word::MAX, Word::MIN];

fn machine(program: &[Instruction]) -> VirtualMachine {
    let mut vm = VirtualMachine::default();
    vm.load(0, &encode_program(program)).expect("program fits");
    vm
}

#[test]
fn add_sums_into_first_register_and_leaves_second() {
    for &r1 in &REGS {
        for &r2 in &REGS {
            if r1 == r2 {
                continue;
            }
            for &v1 in &SAMPLE_VALUES {
                for &v2 in &[3, -9, Word::MAX] {
                    let mut vm = machine(&[Instruction::Add { dst: r1, src: r2 }, Instruction::Hlt]);
                    vm.set_register(r1, v1);
                    vm.set_register(r2, v2);
                    vm.run(&mut ScriptedPorts::new()).expect("add faulted");
                    assert_eq!(vm.register(r1), v1.wrapping_add(v2));
                    assert_eq!(vm.register(r2), v2);
                }
            }
        }
    }
}

#[test]
fn sub_subtracts_second_from_first_with_wrapping() {
    let cases = [
        (10, 3, 7),
        (3, 10, -7),
        (-4, -4, 0),
        (Word::MIN, 1, Word::MAX),
        (Word::MAX, -1, Word::MIN),
    ];
    for (a, b, expected) in cases {
        let mut vm = machine(&[Instruction::Sub { dst: Reg::R2, src: Reg::R6 }, Instruction::Hlt]);
        vm.set_register(Reg::R2, a);
        vm.set_register(Reg::R6, b);
        vm.run(&mut ScriptedPorts::new()).expect("sub faulted");
        assert_eq!(vm.register(Reg::R2), expected, "SUB {} {}", a, b);
        assert_eq!(vm.register(Reg::R6), b);
    }
}

#[test]
fn push_then_pop_is_identity() {
    for &value in &SAMPLE_VALUES {
        let mut vm = machine(&[
            Instruction::Push { reg: Reg::R3 },
            Instruction::Pop { reg: Reg::R3 },
            Instruction::Hlt,
        ]);
        vm.set_register(Reg::R3, value);
        vm.run(&mut ScriptedPorts::new()).expect("push/pop faulted");
        assert_eq!(vm.register(Reg::R3), value);
        assert!(vm.stack().is_empty());
    }
}

#[test]
fn call_then_ret_resumes_after_call_operand() {
    // 0: CALL 20 ; 2: INC r1 ; 4: HLT ... 20: INC r2 ; 22: RET
    let mut vm = machine(&[
        Instruction::Call { target: Addr::new(20) },
        Instruction::Inc { reg: Reg::R1 },
        Instruction::Hlt,
    ]);
    vm.load(20, &encode_program(&[Instruction::Inc { reg: Reg::R2 }, Instruction::Ret]))
        .unwrap();

    let mut ports = ScriptedPorts::new();
    vm.step(&mut ports).unwrap();
    assert_eq!(vm.ip(), 20);
    vm.step(&mut ports).unwrap();
    vm.step(&mut ports).unwrap();
    assert_eq!(vm.ip(), 2);

    assert_eq!(vm.run(&mut ports), Ok(RunOutcome::Halted));
    assert_eq!(vm.register(Reg::R1), 1);
    assert_eq!(vm.register(Reg::R2), 1);
    assert!(vm.stack().is_empty());
}

#[test]
fn cmp_sets_flag_on_equality_only() {
    let cases = [
        (-5, -5, 1),
        (0, 0, 1),
        (5, -5, 0),
        (-1, 1, 0),
        (Word::MIN, Word::MIN, 1),
        (7, 8, 0),
    ];
    for (a, b, expected) in cases {
        let mut vm = machine(&[Instruction::Cmp { lhs: Reg::R1, rhs: Reg::R2 }, Instruction::Hlt]);
        vm.set_register(Reg::R0, 99);
        vm.set_register(Reg::R1, a);
        vm.set_register(Reg::R2, b);
        vm.run(&mut ScriptedPorts::new()).unwrap();
        assert_eq!(vm.register(Reg::R0), expected, "CMP {} {}", a, b);
    }
}

#[test]
fn conditional_jumps_test_register_zero() {
    for (flag, jz_taken) in [(0, true), (-1, false), (1, false)] {
        for (branch, taken) in [
            (Instruction::Jz { target: Addr::new(10) }, jz_taken),
            (Instruction::Jnz { target: Addr::new(10) }, !jz_taken),
        ] {
            let mut vm = machine(&[branch]);
            vm.set_register(Reg::R0, flag);
            vm.step(&mut ScriptedPorts::new()).unwrap();
            let expected = if taken { 10 } else { 2 };
            assert_eq!(vm.ip(), expected, "{} with r0 = {}", branch, flag);
        }
    }
}

#[test]
fn load_add_out_scenario() {
    // Code is placed above the data cells so they do not overlap.
    let code = encode_program(&[
        Instruction::Load { reg: Reg::R0, addr: Addr::new(10) },
        Instruction::Load { reg: Reg::R5, addr: Addr::new(5) },
        Instruction::Add { dst: Reg::R5, src: Reg::R0 },
        Instruction::Inc { reg: Reg::R0 },
        Instruction::Out { port: 1, reg: Reg::R0 },
        Instruction::Out { port: 2, reg: Reg::R5 },
        Instruction::Hlt,
    ]);
    let mut vm = VirtualMachine::default();
    vm.load(100, &code).unwrap();
    vm.load(10, &[5]).unwrap();
    vm.load(5, &[4]).unwrap();
    vm.set_ip(100).unwrap();

    let mut ports = ScriptedPorts::new();
    assert_eq!(vm.run(&mut ports), Ok(RunOutcome::Halted));
    assert_eq!(
        ports.events(),
        &[
            Event::Output { port: 1, value: 6 },
            Event::Output { port: 2, value: 9 },
        ]
    );
    assert!(!vm.is_running());
}

#[test]
fn hlt_stops_fetching() {
    // An invalid opcode right after HLT must never be reached.
    let mut vm = VirtualMachine::default();
    vm.load(0, &[OpCode::Hlt as Word, -1, -1]).unwrap();
    let mut ports = ScriptedPorts::new();
    assert_eq!(vm.run(&mut ports), Ok(RunOutcome::Halted));
    assert_eq!(vm.ip(), 1);
    assert_eq!(vm.steps(), 1);
    assert!(vm.last_fault().is_none());
}

#[test]
fn unknown_opcode_faults_and_halts() {
    let mut vm = VirtualMachine::default();
    vm.load(0, &[OpCode::Nop as Word, 26, OpCode::Hlt as Word]).unwrap();
    let fault = vm.run(&mut ScriptedPorts::new()).unwrap_err();
    assert_eq!(fault.kind, FaultKind::InvalidOpcode { value: 26 });
    assert_eq!(fault.ip, 1);
    assert_eq!(fault.opcode, Some(26));
    assert!(fault.operands.is_empty());
    assert!(!vm.is_running());
}

#[test]
fn div_by_zero_is_a_silent_noop() {
    let mut vm = machine(&[Instruction::Div { dst: Reg::R1, src: Reg::R2 }, Instruction::Hlt]);
    vm.set_register(Reg::R1, 17);
    assert_eq!(vm.run(&mut ScriptedPorts::new()), Ok(RunOutcome::Halted));
    assert_eq!(vm.register(Reg::R1), 17);
}

#[test]
fn pop_and_ret_on_empty_stack_are_noops() {
    let mut vm = machine(&[
        Instruction::Pop { reg: Reg::R4 },
        Instruction::Ret,
        Instruction::Inc { reg: Reg::R4 },
        Instruction::Hlt,
    ]);
    vm.set_register(Reg::R4, 9);
    assert_eq!(vm.run(&mut ScriptedPorts::new()), Ok(RunOutcome::Halted));
    assert_eq!(vm.register(Reg::R4), 10);
}

#[test]
fn out_of_range_operands_fault() {
    let cases: [(Vec<Word>, FaultKind); 4] = [
        (vec![OpCode::Load as Word, 8, 0], FaultKind::InvalidRegister { index: 8 }),
        (vec![OpCode::Store as Word, 0, 65_536], FaultKind::OutOfBounds { address: 65_536 }),
        (vec![OpCode::Jmp as Word, -1], FaultKind::OutOfBounds { address: -1 }),
        (vec![OpCode::Out as Word, 1, -3], FaultKind::InvalidRegister { index: -3 }),
    ];
    for (cells, expected) in cases {
        let mut vm = VirtualMachine::default();
        vm.load(0, &cells).unwrap();
        let fault = vm.run(&mut ScriptedPorts::new()).unwrap_err();
        assert_eq!(fault.kind, expected);
        assert_eq!(fault.operands, cells[1..].to_vec());
    }
}

#[test]
fn running_off_the_end_of_memory_faults() {
    let mut vm = VirtualMachine::new(VmConfig::new().with_memory_size(4)).unwrap();
    vm.load(0, &[OpCode::Nop as Word; 4]).unwrap();
    let fault = vm.run(&mut ScriptedPorts::new()).unwrap_err();
    assert_eq!(fault.kind, FaultKind::OutOfBounds { address: 4 });
    assert_eq!(fault.opcode, None);
    assert_eq!(vm.steps(), 4);
}

#[test]
fn step_limit_leaves_machine_resumable() {
    // 0: INC r1 ; 2: JMP 0
    let mut vm = VirtualMachine::new(VmConfig::new().with_step_limit(10)).unwrap();
    vm.load(0, &encode_program(&[
        Instruction::Inc { reg: Reg::R1 },
        Instruction::Jmp { target: Addr::new(0) },
    ]))
    .unwrap();

    let mut ports = ScriptedPorts::new();
    assert_eq!(vm.run(&mut ports), Ok(RunOutcome::StepLimitReached));
    assert!(vm.is_running());
    assert_eq!(vm.register(Reg::R1), 5);

    assert_eq!(vm.run(&mut ports), Ok(RunOutcome::StepLimitReached));
    assert_eq!(vm.register(Reg::R1), 10);
    assert_eq!(vm.steps(), 20);
}

#[test]
fn countdown_loop_with_subroutine() {
    // r1 counts down from 3; each iteration calls a routine that emits r1 on port 0.
    //  0: IN   r1, 0
    //  3: CALL 20
    //  5: DEC  r1
    //  7: CMP  r1, r2      (r2 == 0)
    // 10: JZ   3           (r0 == 0 means r1 != 0)
    // 12: INT  1
    // 14: HLT
    // 20: OUT  0, r1
    // 23: RET
    let mut vm = machine(&[
        Instruction::In { reg: Reg::R1, port: 0 },
        Instruction::Call { target: Addr::new(20) },
        Instruction::Dec { reg: Reg::R1 },
        Instruction::Cmp { lhs: Reg::R1, rhs: Reg::R2 },
        Instruction::Jz { target: Addr::new(3) },
        Instruction::Int { code: 1 },
        Instruction::Hlt,
    ]);
    vm.load(20, &encode_program(&[Instruction::Out { port: 0, reg: Reg::R1 }, Instruction::Ret]))
        .unwrap();

    let mut ports = ScriptedPorts::with_inputs([3]);
    assert_eq!(vm.run(&mut ports), Ok(RunOutcome::Halted));
    assert_eq!(
        ports.events(),
        &[
            Event::Output { port: 0, value: 3 },
            Event::Output { port: 0, value: 2 },
            Event::Output { port: 0, value: 1 },
            Event::Interrupt { code: 1 },
        ]
    );
}
