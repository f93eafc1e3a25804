//! Append-only assembly buffer framed by the fixed runtime boilerplate.
//!
//! The output targets NASM (`-f elf32`) and links against a C runtime for
//! `scanf`, `printf`, `fflush` and `stdout`.

use std::fmt;

pub const HEADER: &str = "\
; constants
SYS_EXIT equ 1
SYS_READ equ 3
SYS_WRITE equ 4
STDIN equ 0
STDOUT equ 1
True equ 1
False equ 0

segment .data

formatin: db \"%d\", 0
formatout: db \"%d\", 10, 0 ; newline, nul terminator
scanint: times 4 db 0 ; 32-bit integer

segment .bss
res RESB 1

section .text
global main
extern scanf
extern printf
extern fflush
extern stdout

; comparison results: flags from a prior CMP in, 0/1 in EAX out
binop_je:
JE binop_true
JMP binop_false

binop_jg:
JG binop_true
JMP binop_false

binop_jl:
JL binop_true
JMP binop_false

binop_false:
MOV EAX, False
JMP binop_exit
binop_true:
MOV EAX, True
binop_exit:
RET

main:

PUSH EBP
MOV EBP, ESP

; generated code
";

pub const FOOTER: &str = "
; exit
PUSH DWORD [stdout]
CALL fflush
ADD ESP, 4

MOV ESP, EBP
POP EBP

MOV EAX, SYS_EXIT
XOR EBX, EBX
INT 0x80
";

#[derive(Debug)]
pub struct Assembly {
    text: String,
}

impl Default for Assembly {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembly {
    pub fn new() -> Self {
        Self {
            text: HEADER.to_string(),
        }
    }

    /// Appends one line of generated code.
    pub fn emit(&mut self, line: fmt::Arguments) {
        self.text += &format!("{line}\n");
    }

    pub fn finish(mut self) -> String {
        self.text.push_str(FOOTER);
        self.text
    }
}
