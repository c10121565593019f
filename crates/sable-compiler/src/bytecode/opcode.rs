//! Instruction set of the expression code sink.
//!
//! A stack machine in the shape of a managed IL: operands are pushed, consumed
//! by the instruction and the result is pushed back. Each opcode is a single
//! byte followed by its inline operands.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool (8-bit index).
    Constant = 0,
    /// Push constant from pool (16-bit index, big-endian).
    ConstantWide,
    PushNull,
    PushTrue,
    PushFalse,
    /// Push int 0.
    PushZero,
    /// Push int 1.
    PushOne,
    /// Push int -1.
    PushMinusOne,

    // =========================================================================
    // Stack
    // =========================================================================
    Pop,
    Dup,

    // =========================================================================
    // Locals and arguments
    // =========================================================================
    /// Operand: u16 slot
    LdLoc,
    /// Operand: u16 slot
    StLoc,
    /// Push the address of a local. Operand: u16 slot
    LdLocA,
    /// Operand: u16 argument index
    LdArg,
    /// Operand: u16 argument index
    StArg,
    /// Push the address of an argument. Operand: u16 argument index
    LdArgA,

    // =========================================================================
    // Fields
    // =========================================================================
    /// Operand: u16 constant index (field hash)
    LdFld,
    StFld,
    LdFldA,
    LdSFld,
    StSFld,
    LdSFldA,

    // =========================================================================
    // Indirect access
    // =========================================================================
    /// Load a primitive, pointer or reference through an address.
    /// Operand: u16 constant index (value type)
    LdInd,
    StInd,
    /// Load a struct through an address. Operand: u16 constant index (type)
    LdObj,
    StObj,
    /// Zero the struct at an address. Operand: u16 constant index (type)
    InitObj,

    // =========================================================================
    // Arrays
    // =========================================================================
    /// Create a rank-1 array. Stack: [length] -> [array].
    /// Operand: u16 constant index (element type)
    NewArr,
    /// Operand: u16 constant index (element type)
    LdElem,
    StElem,
    LdElemA,
    /// Load an element of a reference-typed array. Operand: u16 constant index (element type)
    LdElemRef,
    StElemRef,
    LdLen,
    /// Copy a constant blob into the array on top of the stack.
    /// Stack: [array] -> []. Operand: u16 constant index (blob)
    InitializeArray,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    Add,
    /// Add with signed overflow check.
    AddOvf,
    /// Add with unsigned overflow check.
    AddOvfUn,
    Sub,
    SubOvf,
    SubOvfUn,
    Mul,
    MulOvf,
    MulOvfUn,
    Div,
    DivUn,
    Rem,
    RemUn,
    Neg,

    // =========================================================================
    // Bitwise
    // =========================================================================
    And,
    Or,
    Xor,
    /// Ones complement.
    Not,
    Shl,
    Shr,
    ShrUn,

    // =========================================================================
    // Comparisons (push bool)
    // =========================================================================
    Ceq,
    Cgt,
    /// Unsigned or unordered greater than.
    CgtUn,
    Clt,
    /// Unsigned or unordered less than.
    CltUn,

    // =========================================================================
    // Branches
    // =========================================================================
    /// Operand: i32 relative offset (big-endian) for every branch.
    Br,
    BrTrue,
    BrFalse,
    Beq,
    BneUn,
    Blt,
    BltUn,
    Ble,
    BleUn,
    Bgt,
    BgtUn,
    Bge,
    BgeUn,

    // =========================================================================
    // Conversions
    // =========================================================================
    ConvI1,
    ConvI2,
    ConvI4,
    ConvI8,
    ConvU1,
    ConvU2,
    ConvU4,
    ConvU8,
    ConvR4,
    ConvR8,
    /// Unsigned integer to floating point.
    ConvRUn,
    /// Native integer, used for pointer offsets.
    ConvI,
    ConvOvfI1,
    ConvOvfI2,
    ConvOvfI4,
    ConvOvfI8,
    ConvOvfU1,
    ConvOvfU2,
    ConvOvfU4,
    ConvOvfU8,
    /// Checked conversions from an unsigned source.
    ConvOvfI1Un,
    ConvOvfI2Un,
    ConvOvfI4Un,
    ConvOvfI8Un,
    ConvOvfU1Un,
    ConvOvfU2Un,
    ConvOvfU4Un,
    ConvOvfU8Un,

    // =========================================================================
    // Objects
    // =========================================================================
    /// Operand: u16 constant index (value type)
    Box,
    /// Operand: u16 constant index (value type)
    UnboxAny,
    /// Checked reference cast. Operand: u16 constant index (target type)
    CastClass,
    /// Push the object if it is an instance of the type, otherwise null.
    /// Operand: u16 constant index (target type)
    IsInst,
    /// Push the size in bytes of a value type. Operand: u16 constant index (type)
    SizeOf,
    /// Push the `Type` object of a type. Operand: u16 constant index (type)
    LdToken,
    /// Allocate stack memory. Stack: [bytes] -> [pointer]
    LocAlloc,
    /// Allocate and construct. Operands: u16 constant index (constructor), u8 arg count
    NewObj,

    // =========================================================================
    // Calls
    // =========================================================================
    /// Non-virtual call. Operands: u16 constant index (method), u8 arg count
    Call,
    /// Virtual call. Operands: u16 constant index (method), u8 arg count
    CallVirt,
}

impl OpCode {
    /// Convert from u8, returning None for invalid values.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Size in bytes of the inline operands, excluding the opcode byte.
    pub fn operand_size(&self) -> usize {
        use OpCode::*;
        match self {
            Constant => 1,

            ConstantWide | LdLoc | StLoc | LdLocA | LdArg | StArg | LdArgA | LdFld | StFld
            | LdFldA | LdSFld | StSFld | LdSFldA | LdInd | StInd | LdObj | StObj | InitObj
            | NewArr | LdElem | StElem | LdElemA | LdElemRef | StElemRef | InitializeArray | Box
            | UnboxAny | CastClass | IsInst | SizeOf | LdToken => 2,

            NewObj | Call | CallVirt => 3,

            Br | BrTrue | BrFalse | Beq | BneUn | Blt | BltUn | Ble | BleUn | Bgt | BgtUn
            | Bge | BgeUn => 4,

            _ => 0,
        }
    }

    pub fn is_branch(&self) -> bool {
        self.operand_size() == 4
    }

    /// Whether the instruction is one of the overflow checking forms.
    pub fn is_checked(&self) -> bool {
        use OpCode::*;
        matches!(
            self,
            AddOvf
                | AddOvfUn
                | SubOvf
                | SubOvfUn
                | MulOvf
                | MulOvfUn
                | ConvOvfI1
                | ConvOvfI2
                | ConvOvfI4
                | ConvOvfI8
                | ConvOvfU1
                | ConvOvfU2
                | ConvOvfU4
                | ConvOvfU8
                | ConvOvfI1Un
                | ConvOvfI2Un
                | ConvOvfI4Un
                | ConvOvfI8Un
                | ConvOvfU1Un
                | ConvOvfU2Un
                | ConvOvfU4Un
                | ConvOvfU8Un
        )
    }

    /// Name of this opcode for disassembly and test output.
    pub fn name(&self) -> &'static str {
        use OpCode::*;
        match self {
            Constant => "CONSTANT",
            ConstantWide => "CONSTANT_WIDE",
            PushNull => "PUSH_NULL",
            PushTrue => "PUSH_TRUE",
            PushFalse => "PUSH_FALSE",
            PushZero => "PUSH_ZERO",
            PushOne => "PUSH_ONE",
            PushMinusOne => "PUSH_MINUS_ONE",
            Pop => "POP",
            Dup => "DUP",
            LdLoc => "LDLOC",
            StLoc => "STLOC",
            LdLocA => "LDLOCA",
            LdArg => "LDARG",
            StArg => "STARG",
            LdArgA => "LDARGA",
            LdFld => "LDFLD",
            StFld => "STFLD",
            LdFldA => "LDFLDA",
            LdSFld => "LDSFLD",
            StSFld => "STSFLD",
            LdSFldA => "LDSFLDA",
            LdInd => "LDIND",
            StInd => "STIND",
            LdObj => "LDOBJ",
            StObj => "STOBJ",
            InitObj => "INITOBJ",
            NewArr => "NEWARR",
            LdElem => "LDELEM",
            StElem => "STELEM",
            LdElemA => "LDELEMA",
            LdElemRef => "LDELEM_REF",
            StElemRef => "STELEM_REF",
            LdLen => "LDLEN",
            InitializeArray => "INITIALIZE_ARRAY",
            Add => "ADD",
            AddOvf => "ADD_OVF",
            AddOvfUn => "ADD_OVF_UN",
            Sub => "SUB",
            SubOvf => "SUB_OVF",
            SubOvfUn => "SUB_OVF_UN",
            Mul => "MUL",
            MulOvf => "MUL_OVF",
            MulOvfUn => "MUL_OVF_UN",
            Div => "DIV",
            DivUn => "DIV_UN",
            Rem => "REM",
            RemUn => "REM_UN",
            Neg => "NEG",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Not => "NOT",
            Shl => "SHL",
            Shr => "SHR",
            ShrUn => "SHR_UN",
            Ceq => "CEQ",
            Cgt => "CGT",
            CgtUn => "CGT_UN",
            Clt => "CLT",
            CltUn => "CLT_UN",
            Br => "BR",
            BrTrue => "BRTRUE",
            BrFalse => "BRFALSE",
            Beq => "BEQ",
            BneUn => "BNE_UN",
            Blt => "BLT",
            BltUn => "BLT_UN",
            Ble => "BLE",
            BleUn => "BLE_UN",
            Bgt => "BGT",
            BgtUn => "BGT_UN",
            Bge => "BGE",
            BgeUn => "BGE_UN",
            ConvI1 => "CONV_I1",
            ConvI2 => "CONV_I2",
            ConvI4 => "CONV_I4",
            ConvI8 => "CONV_I8",
            ConvU1 => "CONV_U1",
            ConvU2 => "CONV_U2",
            ConvU4 => "CONV_U4",
            ConvU8 => "CONV_U8",
            ConvR4 => "CONV_R4",
            ConvR8 => "CONV_R8",
            ConvRUn => "CONV_R_UN",
            ConvI => "CONV_I",
            ConvOvfI1 => "CONV_OVF_I1",
            ConvOvfI2 => "CONV_OVF_I2",
            ConvOvfI4 => "CONV_OVF_I4",
            ConvOvfI8 => "CONV_OVF_I8",
            ConvOvfU1 => "CONV_OVF_U1",
            ConvOvfU2 => "CONV_OVF_U2",
            ConvOvfU4 => "CONV_OVF_U4",
            ConvOvfU8 => "CONV_OVF_U8",
            ConvOvfI1Un => "CONV_OVF_I1_UN",
            ConvOvfI2Un => "CONV_OVF_I2_UN",
            ConvOvfI4Un => "CONV_OVF_I4_UN",
            ConvOvfI8Un => "CONV_OVF_I8_UN",
            ConvOvfU1Un => "CONV_OVF_U1_UN",
            ConvOvfU2Un => "CONV_OVF_U2_UN",
            ConvOvfU4Un => "CONV_OVF_U4_UN",
            ConvOvfU8Un => "CONV_OVF_U8_UN",
            Box => "BOX",
            UnboxAny => "UNBOX_ANY",
            CastClass => "CASTCLASS",
            IsInst => "ISINST",
            SizeOf => "SIZEOF",
            LdToken => "LDTOKEN",
            LocAlloc => "LOCALLOC",
            NewObj => "NEWOBJ",
            Call => "CALL",
            CallVirt => "CALLVIRT",
        }
    }

    /// The branch taken on the opposite outcome of a conditional branch.
    ///
    /// Floating point comparisons flip between the ordered and unordered
    /// forms so that NaN still takes the negated branch; integer comparisons
    /// keep their signedness.
    pub fn negate_branch(&self, floating: bool) -> Option<OpCode> {
        use OpCode::*;
        Some(match (self, floating) {
            (BrTrue, _) => BrFalse,
            (BrFalse, _) => BrTrue,
            (Beq, _) => BneUn,
            (BneUn, _) => Beq,
            (Blt, true) => BgeUn,
            (BltUn, true) => Bge,
            (Ble, true) => BgtUn,
            (BleUn, true) => Bgt,
            (Bgt, true) => BleUn,
            (BgtUn, true) => Ble,
            (Bge, true) => BltUn,
            (BgeUn, true) => Blt,
            (Blt, false) => Bge,
            (Bge, false) => Blt,
            (BltUn, false) => BgeUn,
            (BgeUn, false) => BltUn,
            (Ble, false) => Bgt,
            (Bgt, false) => Ble,
            (BleUn, false) => BgtUn,
            (BgtUn, false) => BleUn,
            _ => return None,
        })
    }
}
