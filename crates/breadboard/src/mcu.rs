//! Microcontroller: register file, compile step and interpreter.
//!
//! Programs are assembly-style text compiled at board initialise
//! into per-line token arrays. The interpreter executes at most one
//! instruction per tick. An instruction whose operands are not all
//! available this tick (an X-bus handshake still in flight) leaves
//! `line` untouched and is re-attempted next tick; `slp` stalls for
//! a counted number of ticks.
//!
//! # Instruction set
//!
//! | Mnemonic | Form | Effect |
//! |----------|------|--------|
//! | `mov`    | `mov <S> <D>` | copy source to register/S-pin/X-pin |
//! | `add` `sub` `mul` `div` `mod` | `op <S>` | arithmetic on `acc` |
//! | `or` `and` `xor` | `op <S>` | bitwise on `acc` |
//! | `not`    | `not` | `acc = !acc` |
//! | `bsl` `bsr` | `op <S>` | shift `acc` left/right |
//! | `slp`    | `slp <S>` | sleep for `<S>` ticks |
//! | `stop`   | `stop` | halt until reset |
//! | `jmp`    | `jmp <L>` | jump to label or line |
//! | `jif`    | `jif <S> <L>` | jump when `<S>` is non-zero |
//! | `jeq` `jne` `jgt` `jlt` `jge` `jle` | `op <A> <B> <L>` | compare and jump |
//!
//! Lines starting with `#` are comments; a lone token ending in `:`
//! declares a label.

use std::collections::HashMap;

use breadboard_core::{Observable, Value};

use crate::bus::{SBus, XBus, XBusState};
use crate::error::SimError;

/// Reserved accumulator register address.
pub const ACC: &str = "acc";

/// A named 64-bit register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub address: String,
    pub value: i64,
}

impl Register {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            value: 0,
        }
    }
}

/// Outcome of one attempted instruction.
enum Step {
    /// Completed; continue at the following line.
    Next,
    /// Completed; continue at the given compiled line.
    Jump(i64),
    /// Operand or handshake not ready; retry next tick.
    Stall,
    /// `stop`: completed, then halt.
    Halt,
}

/// A programmable microcontroller.
#[derive(Debug, Clone, PartialEq)]
pub struct Mcu {
    /// Register file; index 0 is always the accumulator.
    registers: Vec<Register>,
    source: String,
    /// Token arrays, one per instruction.
    compiled: Vec<Vec<String>>,
    /// Label name to compiled-line index.
    labels: HashMap<String, usize>,
    /// 1-based source line per compiled instruction, for diagnostics.
    source_lines: Vec<usize>,
    line: usize,
    sleep_cycles: i64,
    ops: u64,
    running: bool,
    error: bool,
    /// Cached index of the accumulator in `registers`.
    accumulator: usize,
}

impl Default for Mcu {
    fn default() -> Self {
        Self::new()
    }
}

impl Mcu {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: vec![Register::new(ACC)],
            source: String::new(),
            compiled: Vec::new(),
            labels: HashMap::new(),
            source_lines: Vec::new(),
            line: 0,
            sleep_cycles: 0,
            ops: 0,
            running: false,
            error: false,
            accumulator: 0,
        }
    }

    /// Add a general-purpose register. The accumulator is built in.
    pub fn add_register(&mut self, address: impl Into<String>) {
        self.registers.push(Register::new(address));
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    #[must_use]
    pub fn ops(&self) -> u64 {
        self.ops
    }

    #[must_use]
    pub fn running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error
    }

    #[must_use]
    pub fn acc(&self) -> i64 {
        self.registers[self.accumulator].value
    }

    /// Value of the register at `address`, if one exists.
    #[must_use]
    pub fn register_value(&self, address: &str) -> Option<i64> {
        self.registers
            .iter()
            .find(|r| r.address == address)
            .map(|r| r.value)
    }

    pub fn register_addresses(&self) -> impl Iterator<Item = &str> {
        self.registers.iter().map(|r| r.address.as_str())
    }

    /// Compile `source` into token arrays.
    ///
    /// Validates that registers and pins have pairwise-disjoint
    /// addresses, strips comments and blank lines, resolves label
    /// declarations, and rewinds execution state. Instructions
    /// themselves are validated when executed.
    ///
    /// # Errors
    ///
    /// `SimError::DuplicateAddress` on a data-location clash;
    /// `SimError::Program` on a malformed or colliding label, with
    /// the 1-based source line.
    pub fn compile(&mut self, sbuses: &[SBus], xbuses: &[XBus]) -> Result<(), SimError> {
        self.compiled.clear();
        self.labels.clear();
        self.source_lines.clear();

        if let Err(e) = self.check_disjoint_addresses(sbuses, xbuses) {
            self.error = true;
            return Err(e);
        }

        let source = std::mem::take(&mut self.source);
        for (index, raw) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if tokens.len() == 1 && tokens[0].ends_with(':') {
                let name = &tokens[0][..tokens[0].len() - 1];
                if let Err(e) = self.declare_label(name, line_no, sbuses, xbuses) {
                    self.error = true;
                    self.source = source;
                    return Err(e);
                }
                continue;
            }

            self.compiled.push(tokens);
            self.source_lines.push(line_no);
        }
        self.source = source;

        self.accumulator = self
            .registers
            .iter()
            .position(|r| r.address == ACC)
            .unwrap_or(0);
        self.running = !self.compiled.is_empty();
        self.line = 0;
        self.sleep_cycles = 0;
        self.error = false;
        Ok(())
    }

    fn check_disjoint_addresses(&self, sbuses: &[SBus], xbuses: &[XBus]) -> Result<(), SimError> {
        let mut seen = std::collections::HashSet::new();
        let addresses = self
            .registers
            .iter()
            .map(|r| r.address.as_str())
            .chain(sbuses.iter().map(|s| s.address.as_str()))
            .chain(xbuses.iter().map(|x| x.address.as_str()));
        for address in addresses {
            if !seen.insert(address) {
                return Err(SimError::DuplicateAddress {
                    address: address.to_string(),
                });
            }
        }
        Ok(())
    }

    fn declare_label(
        &mut self,
        name: &str,
        line_no: usize,
        sbuses: &[SBus],
        xbuses: &[XBus],
    ) -> Result<(), SimError> {
        if !is_identifier(name) {
            return Err(SimError::program(
                line_no,
                format!("invalid label name '{name}'"),
            ));
        }
        let collides = self.registers.iter().any(|r| r.address == name)
            || sbuses.iter().any(|s| s.address == name)
            || xbuses.iter().any(|x| x.address == name);
        if collides {
            return Err(SimError::program(
                line_no,
                format!("label '{name}' conflicts with a data location address"),
            ));
        }
        // Redeclaration overwrites: last definition wins.
        self.labels.insert(name.to_string(), self.compiled.len());
        Ok(())
    }

    /// One simulation step: at most one instruction attempt.
    ///
    /// `s_net` holds the per-S-pin net level (own value combined
    /// with every peer), indexed like `sbuses`.
    ///
    /// # Errors
    ///
    /// `SimError::Program` on any fault; the `error` flag is set
    /// and execution stops until `reset`.
    pub fn step(
        &mut self,
        sbuses: &mut [SBus],
        xbuses: &mut [XBus],
        s_net: &[i64],
    ) -> Result<(), SimError> {
        if !self.running || self.error {
            return Ok(());
        }
        if self.sleep_cycles > 0 {
            self.sleep_cycles -= 1;
            return Ok(());
        }

        let tokens = self.compiled[self.line].clone();
        let line_no = self.source_lines[self.line];
        match self.exec(&tokens, line_no, sbuses, xbuses, s_net) {
            Ok(Step::Next) => {
                self.ops += 1;
                self.set_line(self.line + 1);
            }
            Ok(Step::Jump(target)) => {
                if target < 0 || target as usize > self.compiled.len() {
                    self.error = true;
                    return Err(SimError::program(
                        line_no,
                        format!("jump target {target} out of range"),
                    ));
                }
                self.ops += 1;
                self.set_line(target as usize);
            }
            Ok(Step::Stall) => {}
            Ok(Step::Halt) => {
                self.ops += 1;
                self.set_line(self.line + 1);
                self.running = false;
            }
            Err(e) => {
                self.error = true;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Line setter: one past the end wraps to 0, looping the program.
    fn set_line(&mut self, line: usize) {
        self.line = if line >= self.compiled.len() { 0 } else { line };
    }

    fn exec(
        &mut self,
        tokens: &[String],
        line_no: usize,
        sbuses: &mut [SBus],
        xbuses: &mut [XBus],
        s_net: &[i64],
    ) -> Result<Step, SimError> {
        let mnemonic = tokens[0].as_str();
        let args = &tokens[1..];
        match mnemonic {
            "mov" => {
                expect_args(mnemonic, args, 2, line_no)?;
                let Some(value) = self.read(&args[0], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                self.write(&args[1], value, sbuses, xbuses, line_no)
            }
            "add" | "sub" | "mul" | "div" | "mod" | "or" | "and" | "xor" | "bsl" | "bsr" => {
                expect_args(mnemonic, args, 1, line_no)?;
                let Some(value) = self.read(&args[0], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                let acc = self.registers[self.accumulator].value;
                let result = match mnemonic {
                    "add" => acc.wrapping_add(value),
                    "sub" => acc.wrapping_sub(value),
                    "mul" => acc.wrapping_mul(value),
                    "div" => {
                        if value == 0 {
                            return Err(SimError::program(line_no, "division by zero"));
                        }
                        acc.wrapping_div(value)
                    }
                    "mod" => {
                        if value == 0 {
                            return Err(SimError::program(line_no, "modulo by zero"));
                        }
                        acc.wrapping_rem(value)
                    }
                    "or" => acc | value,
                    "and" => acc & value,
                    "xor" => acc ^ value,
                    "bsl" => acc << ((value as i32) & 63),
                    "bsr" => acc >> ((value as i32) & 63),
                    _ => unreachable!("mnemonic list above"),
                };
                self.registers[self.accumulator].value = result;
                Ok(Step::Next)
            }
            "not" => {
                expect_args(mnemonic, args, 0, line_no)?;
                self.registers[self.accumulator].value = !self.registers[self.accumulator].value;
                Ok(Step::Next)
            }
            "slp" => {
                expect_args(mnemonic, args, 1, line_no)?;
                let Some(value) = self.read(&args[0], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                self.sleep_cycles = value;
                Ok(Step::Next)
            }
            "stop" => {
                expect_args(mnemonic, args, 0, line_no)?;
                Ok(Step::Halt)
            }
            "jmp" => {
                expect_args(mnemonic, args, 1, line_no)?;
                let Some(target) = self.read(&args[0], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                Ok(Step::Jump(target))
            }
            // Historical form: `jif <S> <L>` behaves as `jne <S> 0 <L>`.
            "jif" => {
                expect_args(mnemonic, args, 2, line_no)?;
                let Some(value) = self.read(&args[0], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                let Some(target) = self.read(&args[1], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                if value != 0 {
                    Ok(Step::Jump(target))
                } else {
                    Ok(Step::Next)
                }
            }
            "jeq" | "jne" | "jgt" | "jlt" | "jge" | "jle" => {
                expect_args(mnemonic, args, 3, line_no)?;
                let Some(a) = self.read(&args[0], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                let Some(b) = self.read(&args[1], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                let Some(target) = self.read(&args[2], sbuses, xbuses, s_net, line_no)? else {
                    return Ok(Step::Stall);
                };
                let taken = match mnemonic {
                    "jeq" => a == b,
                    "jne" => a != b,
                    "jgt" => a > b,
                    "jlt" => a < b,
                    "jge" => a >= b,
                    "jle" => a <= b,
                    _ => unreachable!("mnemonic list above"),
                };
                if taken {
                    Ok(Step::Jump(target))
                } else {
                    Ok(Step::Next)
                }
            }
            _ => Err(SimError::program(
                line_no,
                format!("unknown instruction '{mnemonic}'"),
            )),
        }
    }

    /// Resolve a source operand.
    ///
    /// Returns `Ok(None)` when the value is not available this tick
    /// (an X-bus handshake is in flight) — the caller stalls.
    fn read(
        &self,
        arg: &str,
        sbuses: &[SBus],
        xbuses: &mut [XBus],
        s_net: &[i64],
        line_no: usize,
    ) -> Result<Option<i64>, SimError> {
        if let Some(register) = self.registers.iter().find(|r| r.address == arg) {
            return Ok(Some(register.value));
        }
        if let Some(index) = sbuses.iter().position(|s| s.address == arg) {
            return Ok(Some(sbuses[index].value().max(s_net[index])));
        }
        if let Some(pin) = xbuses.iter_mut().find(|x| x.address == arg) {
            if pin.state() == XBusState::Idle {
                pin.set_reading();
                return Ok(None);
            }
            return Ok(pin.take_delivered());
        }
        if arg == "%" {
            return Ok(Some(self.line as i64));
        }
        if let Some(&target) = self.labels.get(arg) {
            return Ok(Some(target as i64));
        }
        let chars: Vec<char> = arg.chars().collect();
        if chars.len() == 3 && chars[0] == '\'' && chars[2] == '\'' {
            return Ok(Some(i64::from(chars[1] as u32)));
        }
        if let Some(value) = parse_radix_suffix(arg) {
            return Ok(Some(value));
        }
        let plain: String = arg.chars().filter(|c| *c != '_').collect();
        if let Ok(value) = plain.parse::<i64>() {
            return Ok(Some(value));
        }
        Err(SimError::program(
            line_no,
            format!("failed to convert {arg} to value"),
        ))
    }

    /// Apply a `mov` destination.
    fn write(
        &mut self,
        dest: &str,
        value: i64,
        sbuses: &mut [SBus],
        xbuses: &mut [XBus],
        line_no: usize,
    ) -> Result<Step, SimError> {
        if let Some(register) = self.registers.iter_mut().find(|r| r.address == dest) {
            register.value = value;
            return Ok(Step::Next);
        }
        if let Some(pin) = sbuses.iter_mut().find(|s| s.address == dest) {
            pin.write(value);
            return Ok(Step::Next);
        }
        if let Some(pin) = xbuses.iter_mut().find(|x| x.address == dest) {
            return Ok(match pin.state() {
                XBusState::Idle => {
                    pin.begin_write(value);
                    Step::Stall
                }
                XBusState::WriteComplete => {
                    pin.acknowledge_write();
                    Step::Next
                }
                _ => Step::Stall,
            });
        }
        Err(SimError::program(
            line_no,
            format!("cannot write to {dest}"),
        ))
    }

    /// Rewind to the default runtime state; the compiled program is
    /// kept.
    pub fn reset(&mut self) {
        for register in &mut self.registers {
            register.value = 0;
        }
        self.line = 0;
        self.sleep_cycles = 0;
        self.ops = 0;
        self.error = false;
        self.running = !self.compiled.is_empty();
    }
}

impl Observable for Mcu {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "acc" => Some(self.acc().into()),
            "line" => Some(self.line.into()),
            "ops" => Some(Value::I64(self.ops as i64)),
            "sleep" => Some(self.sleep_cycles.into()),
            "running" => Some(self.running.into()),
            "error" => Some(self.error.into()),
            _ => self.register_value(path).map(Value::I64),
        }
    }
}

fn expect_args(
    mnemonic: &str,
    args: &[String],
    count: usize,
    line_no: usize,
) -> Result<(), SimError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(SimError::program(
            line_no,
            format!(
                "'{mnemonic}' expects {count} argument(s), got {}",
                args.len()
            ),
        ))
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a literal with a trailing radix suffix: `b`/`o`/`d`/`x`
/// for base 2/8/10/16. Underscores are stripped.
fn parse_radix_suffix(arg: &str) -> Option<i64> {
    let radix = match arg.chars().last()? {
        'b' => 2,
        'o' => 8,
        'd' => 10,
        'x' => 16,
        _ => return None,
    };
    let body: String = arg[..arg.len() - 1].chars().filter(|c| *c != '_').collect();
    if body.is_empty() {
        return None;
    }
    i64::from_str_radix(&body, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Direction, Position};

    fn compiled(source: &str) -> Mcu {
        let mut mcu = Mcu::new();
        mcu.add_register("r0");
        mcu.set_source(source);
        mcu.compile(&[], &[]).expect("compile");
        mcu
    }

    fn run(mcu: &mut Mcu, ticks: usize) {
        for _ in 0..ticks {
            mcu.step(&mut [], &mut [], &[]).expect("step");
        }
    }

    #[test]
    fn compile_skips_comments_and_blanks() {
        let mcu = compiled("# setup\n\n  mov 1 acc  \n# done\nadd 2\n");
        assert_eq!(mcu.compiled.len(), 2);
        assert_eq!(mcu.source_lines, vec![3, 5]);
        assert!(mcu.running());
    }

    #[test]
    fn compile_empty_program_does_not_run() {
        let mut mcu = Mcu::new();
        mcu.set_source("# nothing here\n");
        mcu.compile(&[], &[]).expect("compile");
        assert!(!mcu.running());
    }

    #[test]
    fn label_points_at_next_instruction() {
        let mcu = compiled("mov 0 acc\nloop:\nadd 1\njmp loop\n");
        assert_eq!(mcu.labels.get("loop"), Some(&1));
    }

    #[test]
    fn label_colliding_with_register_is_fatal() {
        let mut mcu = Mcu::new();
        mcu.add_register("r0");
        mcu.set_source("mov 1 acc\nr0:\n");
        let err = mcu.compile(&[], &[]).expect_err("collision");
        assert_eq!(
            err.to_string(),
            "Line 2 - label 'r0' conflicts with a data location address"
        );
    }

    #[test]
    fn malformed_label_is_fatal() {
        let mut mcu = Mcu::new();
        mcu.set_source("9lives:\n");
        let err = mcu.compile(&[], &[]).expect_err("bad label");
        assert!(err.to_string().starts_with("Line 1 - invalid label name"));
    }

    #[test]
    fn duplicate_register_address_is_fatal() {
        let mut mcu = Mcu::new();
        mcu.add_register("r0");
        mcu.add_register("r0");
        mcu.set_source("mov 1 acc\n");
        assert!(matches!(
            mcu.compile(&[], &[]),
            Err(SimError::DuplicateAddress { .. })
        ));
    }

    #[test]
    fn register_bus_address_clash_is_fatal() {
        let mut mcu = Mcu::new();
        mcu.add_register("x0");
        mcu.set_source("mov 1 acc\n");
        let xbuses = [XBus::new("x0", Position::new(0, 0), Direction::Left)];
        assert!(matches!(
            mcu.compile(&[], &xbuses),
            Err(SimError::DuplicateAddress { .. })
        ));
    }

    #[test]
    fn arithmetic_on_accumulator() {
        let mut mcu = compiled("mov 10 acc\nadd 5\nmul 2\nsub 6\ndiv 4\nmod 4\nstop\n");
        run(&mut mcu, 7);
        // ((10 + 5) * 2 - 6) / 4 = 6; 6 mod 4 = 2.
        assert_eq!(mcu.acc(), 2);
        assert!(!mcu.running());
        assert_eq!(mcu.ops(), 7);
    }

    #[test]
    fn bitwise_and_shifts() {
        let mut mcu = compiled("mov 6 acc\nor 9\nand 13\nxor 1\nbsl 2\nbsr 1\nnot\nstop\n");
        run(&mut mcu, 8);
        // 6|9=15, 15&13=13, 13^1=12, 12<<2=48, 48>>1=24, !24=-25.
        assert_eq!(mcu.acc(), -25);
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let mut mcu = compiled("mov 0 r0\ndiv r0\n");
        mcu.step(&mut [], &mut [], &[]).expect("mov");
        let err = mcu.step(&mut [], &mut [], &[]).expect_err("div");
        assert_eq!(err.to_string(), "Line 2 - division by zero");
        assert!(mcu.has_error());
        // A faulted controller holds still.
        mcu.step(&mut [], &mut [], &[]).expect("no-op");
        assert_eq!(mcu.ops(), 1);
    }

    #[test]
    fn unknown_instruction_is_fatal() {
        let mut mcu = compiled("frob 1\n");
        let err = mcu.step(&mut [], &mut [], &[]).expect_err("frob");
        assert_eq!(err.to_string(), "Line 1 - unknown instruction 'frob'");
    }

    #[test]
    fn wrong_arity_is_fatal() {
        let mut mcu = compiled("mov 1\n");
        let err = mcu.step(&mut [], &mut [], &[]).expect_err("arity");
        assert!(err.to_string().contains("expects 2"));
    }

    #[test]
    fn unresolvable_operand_is_fatal() {
        let mut mcu = compiled("add bogus\n");
        let err = mcu.step(&mut [], &mut [], &[]).expect_err("operand");
        assert_eq!(err.to_string(), "Line 1 - failed to convert bogus to value");
    }

    #[test]
    fn program_loops_past_the_end() {
        let mut mcu = compiled("add 1\nadd 1\n");
        run(&mut mcu, 5);
        assert_eq!(mcu.acc(), 5);
        assert_eq!(mcu.line(), 1);
    }

    #[test]
    fn jmp_to_len_wraps_to_start() {
        let mut mcu = compiled("add 1\njmp 2\n");
        run(&mut mcu, 4);
        // add, jmp(wrap), add, jmp(wrap).
        assert_eq!(mcu.acc(), 2);
        assert_eq!(mcu.line(), 0);
    }

    #[test]
    fn jmp_past_len_is_fatal() {
        let mut mcu = compiled("jmp 3\nstop\n");
        let err = mcu.step(&mut [], &mut [], &[]).expect_err("target");
        assert_eq!(err.to_string(), "Line 1 - jump target 3 out of range");
    }

    #[test]
    fn negative_jump_target_is_fatal() {
        let mut mcu = compiled("jmp -1\n");
        assert!(mcu.step(&mut [], &mut [], &[]).is_err());
    }

    #[test]
    fn conditional_jumps() {
        let mut mcu = compiled("mov 3 r0\njlt r0 5 low\nmov 99 acc\nstop\nlow:\nmov 7 acc\nstop\n");
        run(&mut mcu, 4);
        assert_eq!(mcu.acc(), 7);
        assert!(!mcu.running());
    }

    #[test]
    fn jif_behaves_as_jne_zero() {
        let mut mcu = compiled("mov 2 r0\njif r0 skip\nmov 1 acc\nskip:\nstop\n");
        run(&mut mcu, 3);
        assert_eq!(mcu.acc(), 0);

        let mut mcu = compiled("mov 0 r0\njif r0 skip\nmov 1 acc\nskip:\nstop\n");
        run(&mut mcu, 4);
        assert_eq!(mcu.acc(), 1);
    }

    #[test]
    fn sleep_counts_ticks() {
        let mut mcu = compiled("slp 2\nadd 1\nstop\n");
        run(&mut mcu, 2);
        // slp executed, then one sleeping tick; add not yet run.
        assert_eq!(mcu.acc(), 0);
        run(&mut mcu, 2);
        assert_eq!(mcu.acc(), 1);
    }

    #[test]
    fn literal_forms() {
        let mut mcu = compiled(
            "mov 1010b acc\nmov 17o acc\nmov 42d acc\nmov ffx acc\nmov 'A' acc\nmov 1_000 acc\nmov -5 acc\nstop\n",
        );
        let expected = [10, 15, 42, 255, 65, 1000, -5];
        for value in expected {
            mcu.step(&mut [], &mut [], &[]).expect("step");
            assert_eq!(mcu.acc(), value);
        }
    }

    #[test]
    fn percent_resolves_to_current_line() {
        let mut mcu = compiled("add 0\nmov % acc\nstop\n");
        run(&mut mcu, 2);
        assert_eq!(mcu.acc(), 1);
    }

    #[test]
    fn label_resolves_to_compiled_index() {
        let mut mcu = compiled("mov end acc\nstop\nend:\n");
        run(&mut mcu, 1);
        assert_eq!(mcu.acc(), 2);
    }

    #[test]
    fn sbus_operand_reads_net_maximum() {
        let mut mcu = Mcu::new();
        mcu.set_source("mov s0 acc\nstop\n");
        let mut sbuses = vec![SBus::new("s0", Position::new(0, 0), Direction::Left)];
        mcu.compile(&sbuses, &[]).expect("compile");
        sbuses[0].write(40);
        mcu.step(&mut sbuses, &mut [], &[90]).expect("step");
        assert_eq!(mcu.acc(), 90);
    }

    #[test]
    fn mov_to_sbus_saturates() {
        let mut mcu = Mcu::new();
        mcu.set_source("mov 400 s0\nstop\n");
        let mut sbuses = vec![SBus::new("s0", Position::new(0, 0), Direction::Left)];
        mcu.compile(&sbuses, &[]).expect("compile");
        mcu.step(&mut sbuses, &mut [], &[0]).expect("step");
        assert_eq!(sbuses[0].value(), 255);
    }

    #[test]
    fn xbus_read_stalls_until_delivery() {
        let mut mcu = Mcu::new();
        mcu.set_source("mov x0 acc\nstop\n");
        let mut xbuses = vec![XBus::new("x0", Position::new(0, 0), Direction::Left)];
        mcu.compile(&[], &xbuses).expect("compile");

        mcu.step(&mut [], &mut xbuses, &[]).expect("step");
        assert_eq!(xbuses[0].state(), XBusState::Reading);
        assert_eq!(mcu.line(), 0);
        assert_eq!(mcu.ops(), 0);

        // Still waiting: no change.
        mcu.step(&mut [], &mut xbuses, &[]).expect("step");
        assert_eq!(mcu.line(), 0);

        xbuses[0].receive(42);
        mcu.step(&mut [], &mut xbuses, &[]).expect("step");
        assert_eq!(mcu.acc(), 42);
        assert_eq!(mcu.line(), 1);
        assert_eq!(xbuses[0].state(), XBusState::Idle);
    }

    #[test]
    fn xbus_write_stalls_until_acknowledged() {
        let mut mcu = Mcu::new();
        mcu.set_source("mov 9 x0\nstop\n");
        let mut xbuses = vec![XBus::new("x0", Position::new(0, 0), Direction::Left)];
        mcu.compile(&[], &xbuses).expect("compile");

        mcu.step(&mut [], &mut xbuses, &[]).expect("step");
        assert_eq!(xbuses[0].state(), XBusState::Writing);
        assert_eq!(xbuses[0].value(), 9);
        assert_eq!(mcu.line(), 0);

        xbuses[0].complete_write();
        mcu.step(&mut [], &mut xbuses, &[]).expect("step");
        assert_eq!(mcu.line(), 1);
        assert_eq!(xbuses[0].state(), XBusState::Idle);
    }

    #[test]
    fn reset_rewinds_everything() {
        let mut mcu = compiled("mov 5 r0\nadd 3\nstop\n");
        run(&mut mcu, 3);
        assert!(!mcu.running());
        mcu.reset();
        assert_eq!(mcu.acc(), 0);
        assert_eq!(mcu.register_value("r0"), Some(0));
        assert_eq!(mcu.line(), 0);
        assert_eq!(mcu.ops(), 0);
        assert!(mcu.running());
        assert!(!mcu.has_error());
    }

    #[test]
    fn observable_paths() {
        let mut mcu = compiled("mov 5 r0\nstop\n");
        run(&mut mcu, 1);
        assert_eq!(mcu.query("r0"), Some(Value::I64(5)));
        assert_eq!(mcu.query("line"), Some(Value::I64(1)));
        assert_eq!(mcu.query("running"), Some(Value::Bool(true)));
        assert_eq!(mcu.query("nope"), None);
    }
}
