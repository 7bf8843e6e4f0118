use chip8_vm::{Chip8Error, Cpu, MEM_RESERVED, MEM_SIZE, SCREEN_WIDTH};

fn lit_pixels(cpu: &Cpu) -> usize {
    cpu.framebuffer().iter().filter(|&&p| p == 1).count()
}

#[test]
fn counts_down_in_a_loop() {
    // V0 = 5
    // loop: V0 += 0xFF (i.e. -1); SE V0, 0; JP loop
    // halt: JP halt
    let program = [0x60, 0x05, 0x70, 0xFF, 0x30, 0x00, 0x12, 0x02, 0x12, 0x08];
    let mut cpu = Cpu::with_program(&program).unwrap();
    for _ in 0..64 {
        cpu.step().unwrap();
    }
    assert_eq!(cpu.v(0), 0);
    assert_eq!(cpu.pc(), 0x208);
}

#[test]
fn draws_bcd_digits_of_a_register() {
    // V0 = 137; I = 0x300; BCD; load V0..V2; draw each digit glyph
    let program = [
        0x60, 137, // LD V0, 137
        0xA3, 0x00, // LD I, 0x300
        0xF0, 0x33, // LD B, V0
        0xF2, 0x65, // LD V2, [I]
        0x63, 0x00, // LD V3, 0 (x)
        0x64, 0x00, // LD V4, 0 (y)
        0xF0, 0x29, // LD F, V0
        0xD3, 0x45, // DRW V3, V4, 5
        0x73, 0x05, // ADD V3, 5
        0xF1, 0x29, // LD F, V1
        0xD3, 0x45, // DRW V3, V4, 5
        0x73, 0x05, // ADD V3, 5
        0xF2, 0x29, // LD F, V2
        0xD3, 0x45, // DRW V3, V4, 5
    ];
    let mut cpu = Cpu::with_program(&program).unwrap();
    for _ in 0..program.len() / 2 {
        cpu.step().unwrap();
    }
    assert_eq!(&cpu.registers()[..3], &[1, 3, 7]);
    assert_eq!(cpu.i(), 7 * 5);
    assert_eq!(cpu.v(0xF), 0);
    assert!(cpu.consume_dirty_flag());
    // glyph "1" starts with 0x20, at x = 0
    assert_eq!(&cpu.framebuffer()[..4], &[0, 0, 1, 0]);
    // "1" has 8 lit pixels, "3" 14, "7" 8
    assert_eq!(lit_pixels(&cpu), 30);
}

#[test]
fn input_driven_program() {
    // wait for a key into V5, then draw its glyph at (10, 10)
    let program = [
        0xF5, 0x0A, // LD V5, K
        0xF5, 0x29, // LD F, V5
        0x60, 0x0A, // LD V0, 10
        0xD0, 0x05, // DRW V0, V0, 5
        0x12, 0x08, // JP 0x208
    ];
    let mut cpu = Cpu::with_program(&program).unwrap();
    for _ in 0..10 {
        cpu.step().unwrap();
    }
    assert_eq!(cpu.pc(), 0x200);
    assert!(cpu.is_waiting_for_keypress());
    assert!(!cpu.consume_dirty_flag());

    cpu.set_key(0xE, true).unwrap();
    for _ in 0..4 {
        cpu.step().unwrap();
    }
    cpu.set_key(0xE, false).unwrap();
    assert_eq!(cpu.v(5), 0xE);
    assert!(cpu.consume_dirty_flag());
    let top_row = 10 * SCREEN_WIDTH + 10;
    assert_eq!(&cpu.framebuffer()[top_row..top_row + 4], &[1, 1, 1, 1]);
}

#[test]
fn runaway_program_hits_end_of_memory() {
    // a program made of SYS 000 walks off the end of memory
    let mut cpu = Cpu::with_program(&[0; MEM_SIZE - MEM_RESERVED]).unwrap();
    let steps = (MEM_SIZE - MEM_RESERVED) / 2;
    for _ in 0..steps {
        cpu.step().unwrap();
    }
    assert_eq!(
        cpu.step(),
        Err(Chip8Error::PcOutOfBounds {
            pc: MEM_SIZE as u16
        })
    );
}

#[test]
fn errors_render_for_humans() {
    let mut cpu = Cpu::new();
    let err = cpu.load_program(&[0; 5000]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "program is too large (5000 bytes), max size is 3584 bytes"
    );
    assert_eq!(
        Chip8Error::PcOutOfBounds { pc: 0xFFF }.to_string(),
        "program counter 0x0FFF is out of memory bounds"
    );
}
