/// The compiler traverses the analyzed Mica AST and constructs an LLVM
/// Module through LLVM IR.
///
/// All user input is expected to be fully validated by the time it
/// reaches this phase (via syntactic and semantic analysis).  Anything
/// that goes wrong during emission is therefore a bug in the compiler
/// itself, not in the input program, and this module panics rather than
/// trying to recover.
use std::path::Path;

use inkwell::{
    basic_block::BasicBlock,
    builder::Builder,
    context::Context,
    module::Module,
    passes::PassManager,
    targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine},
    types::{BasicMetadataTypeEnum, BasicTypeEnum, IntType},
    values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, IntValue, PointerValue},
    AddressSpace, IntPredicate, OptimizationLevel,
};

use crate::compiler::ast::*;
use crate::compiler::library::library_functions;
use crate::compiler::memory::VarRecord;
use crate::compiler::semantics::stmt_returns;
use crate::result::Result;

use super::stringpool::StringPool;

/// An LLVM IR generator which generates all the code for a single
/// module from one analyzed, frame-planned [`Program`].
pub struct IrGen<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    string_pool: StringPool,
}

/// Per-function state threaded through statement lowering.
struct FnCtx<'ctx> {
    id: FuncId,
    frame_ptr: PointerValue<'ctx>,
    ret_slot: Option<PointerValue<'ctx>>,
    ret_bb: BasicBlock<'ctx>,
}

impl<'ctx> IrGen<'ctx> {
    pub fn new(ctx: &'ctx Context, module: &str) -> IrGen<'ctx> {
        IrGen {
            context: ctx,
            module: ctx.create_module(module),
            builder: ctx.create_builder(),
            string_pool: StringPool::new(),
        }
    }

    /// Compile the program into the LLVM module: string-literal
    /// globals, frame struct types, extern declarations for the runtime
    /// library, one function per definition, and the `main` wrapper the
    /// OS entry point calls.
    pub fn ingest(&mut self, prog: &Program) {
        self.compile_string_pool(prog);
        self.declare_frame_structs(prog);
        self.add_externs();
        for func in &prog.funcs {
            self.add_fn_decl(prog, func);
        }
        for i in 0..prog.funcs.len() {
            self.compile_func(prog, FuncId(i as u32));
        }
        self.create_main(prog);
    }

    /// Run the standard optimization pass pipeline over the module.
    pub fn optimize(&self) {
        let pm: PassManager<Module> = PassManager::create(());
        pm.add_promote_memory_to_register_pass();
        pm.add_instruction_combining_pass();
        pm.add_reassociate_pass();
        pm.add_gvn_pass();
        pm.add_cfg_simplification_pass();
        pm.run_on(&self.module);
    }

    pub fn verify(&self) -> Result<()> {
        self.module.verify().map_err(|e| e.to_string())
    }

    /// Print the LLVM IR to the given file.
    pub fn emit_llvm_ir(&self, path: &Path) -> Result<()> {
        self.module.print_to_file(path).map_err(|e| e.to_string())
    }

    pub fn llvm_ir_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn emit_assembly(&self, path: &Path) -> Result<()> {
        let machine = self.target_machine()?;
        machine
            .write_to_file(&self.module, FileType::Assembly, path)
            .map_err(|e| e.to_string())
    }

    pub fn assembly_string(&self) -> Result<String> {
        let machine = self.target_machine()?;
        let buffer = machine
            .write_to_memory_buffer(&self.module, FileType::Assembly)
            .map_err(|e| e.to_string())?;
        Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
    }

    /// Compile the LLVM IR into an object file for the target platform.
    pub fn emit_object_code(&self, path: &Path) -> Result<()> {
        let machine = self.target_machine()?;
        machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| e.to_string())
    }

    fn target_machine(&self) -> Result<TargetMachine> {
        let triple = TargetMachine::get_default_triple();
        let config = InitializationConfig::default();
        Target::initialize_all(&config);
        let target = Target::from_triple(&triple).map_err(|e| e.to_string())?;

        let machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::None,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or("Could not create a target machine for compilation")?;

        self.module
            .set_data_layout(&machine.get_target_data().get_data_layout());
        self.module.set_triple(&triple);
        Ok(machine)
    }

    /// Add every string literal to the module as a NUL-terminated byte
    /// array global.
    fn compile_string_pool(&mut self, prog: &Program) {
        self.string_pool.extract_from_program(prog);

        for (bytes, id) in self.string_pool.iter() {
            let len_w_null = bytes.len() + 1;
            let g = self.module.add_global(
                self.context.i8_type().array_type(len_w_null as u32),
                None,
                &StringPool::global_name(*id),
            );
            g.set_initializer(&self.context.const_string(bytes, true));
        }
    }

    /// Create the frame struct type for every function, then fill in
    /// the slot lists.  Two passes, because a nested frame's access
    /// link points at its parent's struct type.
    fn declare_frame_structs(&self, prog: &Program) {
        for func in &prog.funcs {
            let frame = frame_of(func);
            self.context.opaque_struct_type(&frame.struct_name);
        }
        for func in &prog.funcs {
            let frame = frame_of(func);
            let mut slots: Vec<BasicTypeEnum<'ctx>> = Vec::new();
            if frame.has_access_link {
                let parent = prog.func(func.parent.unwrap());
                let parent_ty = self
                    .module
                    .get_struct_type(&frame_of(parent).struct_name)
                    .unwrap();
                slots.push(parent_ty.ptr_type(AddressSpace::default()).into());
            }
            for rec in &frame.records {
                slots.push(self.slot_type(rec));
            }
            self.module
                .get_struct_type(&frame.struct_name)
                .unwrap()
                .set_body(&slots, false);
        }
    }

    /// Declare the runtime-library routines as externals.  They take no
    /// access link: they are not nested in the source program.
    fn add_externs(&self) {
        for lib in library_functions() {
            let params: Vec<BasicTypeEnum<'ctx>> =
                lib.params.iter().map(|p| self.param_type(p)).collect();
            self.declare_fn(lib.name, &params, &lib.ret);
        }
    }

    /// Declare a function definition so calls can look its
    /// `FunctionValue` up before its body is compiled.  A nested
    /// function receives its access link as a leading parameter.
    fn add_fn_decl(&self, prog: &Program, func: &FuncDef) {
        let frame = frame_of(func);
        let mut params: Vec<BasicTypeEnum<'ctx>> = Vec::new();
        if frame.has_access_link {
            let parent = prog.func(func.parent.unwrap());
            let parent_ty = self
                .module
                .get_struct_type(&frame_of(parent).struct_name)
                .unwrap();
            params.push(parent_ty.ptr_type(AddressSpace::default()).into());
        }
        for p in func.header.expand_params() {
            params.push(self.param_type(&p));
        }
        self.declare_fn(label_of(func), &params, &func.header.ret);
    }

    fn declare_fn(&self, name: &str, params: &[BasicTypeEnum<'ctx>], ret: &Type) {
        let params: Vec<BasicMetadataTypeEnum<'ctx>> =
            params.iter().map(|p| (*p).into()).collect();
        let fn_type = match ret {
            Type::Proc => self.context.void_type().fn_type(&params, false),
            t => self.scalar_type(t).fn_type(&params, false),
        };
        self.module.add_function(name, fn_type, None);
    }

    /// Create the `main` entry point which the OS calls: it runs the
    /// top-level procedure and exits 0.
    fn create_main(&self, prog: &Program) {
        let main_type = self.context.i64_type().fn_type(&[], false);
        let main = self.module.add_function("main", main_type, None);
        let entry_bb = self.context.append_basic_block(main, "entry");
        self.builder.position_at_end(entry_bb);
        let root = self
            .module
            .get_function(label_of(prog.func(prog.root)))
            .unwrap();
        self.builder.build_call(root, &[], "");
        let status = self.context.i64_type().const_int(0, false);
        self.builder.build_return(Some(&status));
    }

    fn compile_func(&mut self, prog: &Program, f: FuncId) {
        let func = prog.func(f);
        let frame = frame_of(func);
        let fn_val = self.module.get_function(label_of(func)).unwrap();

        let entry_bb = self.context.append_basic_block(fn_val, "entry");
        let ret_bb = self.context.append_basic_block(fn_val, "return");
        self.builder.position_at_end(entry_bb);

        let frame_ty = self.module.get_struct_type(&frame.struct_name).unwrap();
        let frame_ptr = self.builder.build_alloca(frame_ty, "frame");

        let ret_slot = match &func.header.ret {
            Type::Proc => None,
            t => Some(self.builder.build_alloca(self.scalar_type(t), "retval")),
        };

        // Move the incoming arguments into their frame slots; for a
        // nested function the first argument is the access link.
        let llvm_params = fn_val.get_params();
        let mut arg = 0;
        if frame.has_access_link {
            let slot = self.builder.build_struct_gep(frame_ptr, 0, "link").unwrap();
            self.builder.build_store(slot, llvm_params[arg]);
            arg += 1;
        }
        for rec in &frame.records[..frame.param_count] {
            let slot = self
                .builder
                .build_struct_gep(frame_ptr, rec.index, &rec.name)
                .unwrap();
            self.builder.build_store(slot, llvm_params[arg]);
            arg += 1;
        }

        // Local arrays get their backing storage allocated once here;
        // the frame slot holds the base pointer.
        for rec in &frame.records[frame.param_count..] {
            if rec.is_array {
                let count = rec
                    .ty
                    .element_count()
                    .expect("local arrays have fixed dimensions");
                let elem_ty = self.scalar_type(rec.ty.scalar());
                let backing = self
                    .builder
                    .build_alloca(elem_ty.array_type(count), &format!("{}_data", rec.name));
                let zero = self.context.i64_type().const_int(0, false);
                let base = unsafe { self.builder.build_gep(backing, &[zero, zero], &rec.name) };
                let slot = self
                    .builder
                    .build_struct_gep(frame_ptr, rec.index, &rec.name)
                    .unwrap();
                self.builder.build_store(slot, base);
            }
        }

        let ctx = FnCtx {
            id: f,
            frame_ptr,
            ret_slot,
            ret_bb,
        };
        for stmt in &func.body {
            self.compile_stmt(prog, &ctx, stmt);
            if stmt_returns(stmt) {
                break;
            }
        }
        self.branch_if_live(ret_bb);

        self.builder.position_at_end(ret_bb);
        match ret_slot {
            Some(slot) => {
                let v = self.builder.build_load(slot, "ret");
                self.builder.build_return(Some(&v));
            }
            None => {
                self.builder.build_return(None);
            }
        }
    }

    fn compile_stmt(&mut self, prog: &Program, ctx: &FnCtx<'ctx>, stmt: &Stmt) {
        match stmt {
            Stmt::Empty => (),
            Stmt::Assign(lv, e) => {
                let rhs = self.expr_value(prog, ctx, e);
                let addr = self.lvalue_addr(prog, ctx, lv);
                self.builder.build_store(addr, rhs);
            }
            Stmt::Call(call) => {
                self.compile_call(prog, ctx, call);
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.compile_stmt(prog, ctx, s);
                    // Nothing after a definitely-returning statement is
                    // reachable, so stop lowering its siblings.
                    if stmt_returns(s) {
                        break;
                    }
                }
            }
            Stmt::If { cond, then, els } => {
                let cond_val = self.cond_value(prog, ctx, cond);
                let cmp = self.builder.build_int_compare(
                    IntPredicate::NE,
                    cond_val,
                    self.context.bool_type().const_int(0, false),
                    "",
                );
                let current_fn = self.get_current_fn().unwrap();
                let then_bb = self.context.append_basic_block(current_fn, "then");
                match els {
                    Some(els) => {
                        let else_bb = self.context.append_basic_block(current_fn, "else");
                        let cont_bb = self.context.append_basic_block(current_fn, "cont");
                        self.builder.build_conditional_branch(cmp, then_bb, else_bb);

                        self.builder.position_at_end(then_bb);
                        self.compile_stmt(prog, ctx, then);
                        self.branch_if_live(cont_bb);

                        self.builder.position_at_end(else_bb);
                        self.compile_stmt(prog, ctx, els);
                        self.branch_if_live(cont_bb);

                        self.builder.position_at_end(cont_bb);
                    }
                    None => {
                        let cont_bb = self.context.append_basic_block(current_fn, "cont");
                        self.builder.build_conditional_branch(cmp, then_bb, cont_bb);

                        self.builder.position_at_end(then_bb);
                        self.compile_stmt(prog, ctx, then);
                        self.branch_if_live(cont_bb);

                        self.builder.position_at_end(cont_bb);
                    }
                }
            }
            Stmt::While(cond, body) => {
                let current_fn = self.get_current_fn().unwrap();
                // The condition is re-evaluated at the top of every
                // iteration; the body ends with the backedge.
                let cond_bb = self.context.append_basic_block(current_fn, "while_cond");
                let body_bb = self.context.append_basic_block(current_fn, "while_body");
                let after_bb = self.context.append_basic_block(current_fn, "while_end");

                self.builder.build_unconditional_branch(cond_bb);
                self.builder.position_at_end(cond_bb);
                let cond_val = self.cond_value(prog, ctx, cond);
                let cmp = self.builder.build_int_compare(
                    IntPredicate::NE,
                    cond_val,
                    self.context.bool_type().const_int(0, false),
                    "",
                );
                self.builder.build_conditional_branch(cmp, body_bb, after_bb);

                self.builder.position_at_end(body_bb);
                self.compile_stmt(prog, ctx, body);
                self.branch_if_live(cond_bb);

                self.builder.position_at_end(after_bb);
            }
            Stmt::Return(e, _) => {
                if let Some(e) = e {
                    let v = self.expr_value(prog, ctx, e);
                    let slot = ctx
                        .ret_slot
                        .expect("return with a value in a proc function");
                    self.builder.build_store(slot, v);
                }
                self.builder.build_unconditional_branch(ctx.ret_bb);
            }
        }
    }

    /// Compute the address a lvalue denotes.  For scalars this is the
    /// address of the cell; for arrays it is the base pointer to the
    /// first scalar element.
    fn lvalue_addr(&mut self, prog: &Program, ctx: &FnCtx<'ctx>, lv: &LValue) -> PointerValue<'ctx> {
        match &lv.kind {
            LValueKind::Id(name) => self.id_addr(prog, ctx, name),
            LValueKind::Str(bytes) => {
                let id = self
                    .string_pool
                    .get(bytes)
                    .expect("string literal missing from the pool");
                let g = self
                    .module
                    .get_global(&StringPool::global_name(*id))
                    .unwrap();
                let zero = self.context.i64_type().const_int(0, false);
                unsafe {
                    self.builder
                        .build_gep(g.as_pointer_value(), &[zero, zero], "str")
                }
            }
            LValueKind::Index(sub, index) => {
                let base = self.lvalue_addr(prog, ctx, sub);
                let idx = self.expr_value(prog, ctx, index).into_int_value();

                // The flattened offset advances by the element count of
                // the type this indexing step produces: for `m[i]` with
                // `m : int[2][3]` one step of `i` spans 3 ints.
                let span = lv
                    .lv_type
                    .as_ref()
                    .expect("lvalue was not annotated by semantic analysis")
                    .element_count()
                    .expect("indexed lvalues have fixed inner dimensions")
                    as u64;
                let offset = if span == 1 {
                    idx
                } else {
                    let span = self.context.i64_type().const_int(span, false);
                    self.builder.build_int_mul(idx, span, "")
                };
                unsafe { self.builder.build_gep(base, &[offset], "elem") }
            }
        }
    }

    /// Resolve an identifier to an address by walking frames: scan the
    /// current frame's records, and when the name is not there, load
    /// the access link from slot 0 and continue in the parent frame.
    fn id_addr(&mut self, prog: &Program, ctx: &FnCtx<'ctx>, name: &str) -> PointerValue<'ctx> {
        let mut func_id = ctx.id;
        let mut fp = ctx.frame_ptr;
        loop {
            let frame = frame_of(prog.func(func_id));
            if let Some(rec) = frame.lookup(name) {
                let slot = self
                    .builder
                    .build_struct_gep(fp, rec.index, name)
                    .unwrap();
                // Reference and array slots hold the address we want;
                // by-value scalar slots are the address we want.
                return if rec.is_ref || rec.is_array {
                    self.builder.build_load(slot, name).into_pointer_value()
                } else {
                    slot
                };
            }
            if !frame.has_access_link {
                panic!("Could not find {} in any enclosing frame", name);
            }
            let link = self.builder.build_struct_gep(fp, 0, "link").unwrap();
            fp = self.builder.build_load(link, "link").into_pointer_value();
            func_id = prog
                .func(func_id)
                .parent
                .expect("a frame with an access link has a parent");
        }
    }

    fn expr_value(&mut self, prog: &Program, ctx: &FnCtx<'ctx>, e: &Expr) -> BasicValueEnum<'ctx> {
        match &e.kind {
            ExprKind::IntLit(v) => self.context.i64_type().const_int(*v as u64, true).into(),
            ExprKind::CharLit(c) => self.context.i8_type().const_int(*c as u64, false).into(),
            ExprKind::LValue(lv) => {
                let addr = self.lvalue_addr(prog, ctx, lv);
                let is_array = lv
                    .lv_type
                    .as_ref()
                    .expect("lvalue was not annotated by semantic analysis")
                    .is_array();
                // An array used as a value is its base pointer (it can
                // only be an argument to an open-array parameter).
                if is_array {
                    addr.into()
                } else {
                    self.builder.build_load(addr, "")
                }
            }
            ExprKind::Call(call) => self
                .compile_call(prog, ctx, call)
                .expect("call with no value used in an expression"),
            ExprKind::Signed(Sign::Plus, inner) => self.expr_value(prog, ctx, inner),
            ExprKind::Signed(Sign::Minus, inner) => {
                let v = self.expr_value(prog, ctx, inner).into_int_value();
                self.builder.build_int_neg(v, "").into()
            }
            ExprKind::Binary(op, l, r) => {
                let lv = self.expr_value(prog, ctx, l).into_int_value();
                let rv = self.expr_value(prog, ctx, r).into_int_value();
                match op {
                    ArithOp::Add => self.builder.build_int_add(lv, rv, ""),
                    ArithOp::Sub => self.builder.build_int_sub(lv, rv, ""),
                    ArithOp::Mul => self.builder.build_int_mul(lv, rv, ""),
                    ArithOp::Div => self.builder.build_int_signed_div(lv, rv, ""),
                    ArithOp::Mod => self.builder.build_int_signed_rem(lv, rv, ""),
                }
                .into()
            }
            ExprKind::Paren(inner) => self.expr_value(prog, ctx, inner),
        }
    }

    /// Lower a condition to an `i1`.  `and`/`or` short-circuit: the
    /// left side is compared against the value that decides the result
    /// on its own (0 for `and`, 1 for `or`); when it matches, the right
    /// side is never evaluated.  Both paths store into a dedicated
    /// stack slot which the merged block loads.
    fn cond_value(&mut self, prog: &Program, ctx: &FnCtx<'ctx>, cond: &Cond) -> IntValue<'ctx> {
        match &cond.kind {
            CondKind::Compare(op, l, r) => {
                let lv = self.expr_value(prog, ctx, l).into_int_value();
                let rv = self.expr_value(prog, ctx, r).into_int_value();
                let pred = match op {
                    CmpOp::Eq => IntPredicate::EQ,
                    CmpOp::Neq => IntPredicate::NE,
                    CmpOp::Lt => IntPredicate::SLT,
                    CmpOp::Gt => IntPredicate::SGT,
                    CmpOp::LtEq => IntPredicate::SLE,
                    CmpOp::GtEq => IntPredicate::SGE,
                };
                self.builder.build_int_compare(pred, lv, rv, "")
            }
            CondKind::And(l, r) | CondKind::Or(l, r) => {
                let is_and = matches!(cond.kind, CondKind::And(..));
                let prefix = if is_and { "and" } else { "or" };
                let bool_ty = self.context.bool_type();
                let slot = self.builder.build_alloca(bool_ty, "sc");

                let lv = self.cond_value(prog, ctx, l);
                let short = bool_ty.const_int(if is_and { 0 } else { 1 }, false);
                let cmp = self
                    .builder
                    .build_int_compare(IntPredicate::EQ, lv, short, "");

                let current_fn = self.get_current_fn().unwrap();
                let skip_bb = self
                    .context
                    .append_basic_block(current_fn, &format!("{}_skip", prefix));
                let rhs_bb = self
                    .context
                    .append_basic_block(current_fn, &format!("{}_rhs", prefix));
                let merge_bb = self
                    .context
                    .append_basic_block(current_fn, &format!("{}_end", prefix));
                self.builder.build_conditional_branch(cmp, skip_bb, rhs_bb);

                self.builder.position_at_end(skip_bb);
                self.builder.build_store(slot, short);
                self.builder.build_unconditional_branch(merge_bb);

                self.builder.position_at_end(rhs_bb);
                let rv = self.cond_value(prog, ctx, r);
                self.builder.build_store(slot, rv);
                self.builder.build_unconditional_branch(merge_bb);

                self.builder.position_at_end(merge_bb);
                self.builder.build_load(slot, "").into_int_value()
            }
            CondKind::Not(inner) => {
                let v = self.cond_value(prog, ctx, inner);
                self.builder.build_not(v, "")
            }
            CondKind::Paren(inner) => self.cond_value(prog, ctx, inner),
        }
    }

    /// Lower a call.  By-reference arguments are passed as addresses,
    /// by-value arguments as loaded values.  A call to a nested
    /// function also receives the frame of the callee's lexical parent,
    /// found by walking the caller's access-link chain.
    fn compile_call(
        &mut self,
        prog: &Program,
        ctx: &FnCtx<'ctx>,
        call: &Call,
    ) -> Option<BasicValueEnum<'ctx>> {
        let info = call
            .info
            .as_ref()
            .expect("call was not annotated by semantic analysis");

        let mut args: Vec<BasicValueEnum<'ctx>> = Vec::new();
        if !info.library && info.level > 0 {
            let caller_level = prog
                .func(ctx.id)
                .level
                .expect("caller was not annotated by semantic analysis");
            // The callee's parent sits at level `info.level - 1`; hop up
            // the static chain until its frame is in hand.  Zero hops
            // means the callee is local to the caller, which then
            // passes its own frame.
            let hops = caller_level + 1 - info.level;
            let mut fp = ctx.frame_ptr;
            let mut func_id = ctx.id;
            for _ in 0..hops {
                let link = self.builder.build_struct_gep(fp, 0, "link").unwrap();
                fp = self.builder.build_load(link, "link").into_pointer_value();
                func_id = prog.func(func_id).parent.unwrap();
            }
            args.push(fp.into());
        }

        for (arg, (_, by_ref)) in call.args.iter().zip(info.params.iter()) {
            let v = if *by_ref {
                let lv = ref_arg_lvalue(arg);
                self.lvalue_addr(prog, ctx, lv).into()
            } else {
                self.expr_value(prog, ctx, arg)
            };
            args.push(v);
        }

        let callee = self
            .module
            .get_function(&info.label)
            .unwrap_or_else(|| panic!("Could not find function {}", info.label));
        // The result of a value-returning call carries the callee's name;
        // void instructions cannot be named.
        let name = match info.ret {
            Type::Proc => "",
            _ => call.name.as_str(),
        };
        let args: Vec<BasicMetadataValueEnum<'ctx>> = args.into_iter().map(|v| v.into()).collect();
        let result = self.builder.build_call(callee, &args, name);
        result.try_as_basic_value().left()
    }

    /// Branch to `target` unless the current block already ended (a
    /// `return` statement leaves it terminated).
    fn branch_if_live(&self, target: BasicBlock<'ctx>) {
        let bb = self.builder.get_insert_block().unwrap();
        if bb.get_terminator().is_none() {
            self.builder.build_unconditional_branch(target);
        }
    }

    /// If the builder cursor is currently within a function, return it.
    fn get_current_fn(&self) -> Option<FunctionValue<'ctx>> {
        self.builder
            .get_insert_block()
            .and_then(|bb| bb.get_parent())
    }

    fn scalar_type(&self, ty: &Type) -> IntType<'ctx> {
        match ty {
            Type::Int => self.context.i64_type(),
            Type::Char => self.context.i8_type(),
            other => panic!("{} has no scalar LLVM type", other),
        }
    }

    /// The LLVM type of one frame slot.
    fn slot_type(&self, rec: &VarRecord) -> BasicTypeEnum<'ctx> {
        if rec.is_array {
            self.scalar_type(rec.ty.scalar())
                .ptr_type(AddressSpace::default())
                .into()
        } else if rec.is_ref {
            self.scalar_type(&rec.ty)
                .ptr_type(AddressSpace::default())
                .into()
        } else {
            self.scalar_type(&rec.ty).into()
        }
    }

    /// The LLVM type with which a parameter is passed: arrays and
    /// by-reference scalars travel as pointers, the rest by value.
    fn param_type(&self, p: &ParamSig) -> BasicTypeEnum<'ctx> {
        if p.ty.is_array() {
            self.scalar_type(p.ty.scalar())
                .ptr_type(AddressSpace::default())
                .into()
        } else if p.by_ref {
            self.scalar_type(&p.ty)
                .ptr_type(AddressSpace::default())
                .into()
        } else {
            self.scalar_type(&p.ty).into()
        }
    }
}

fn frame_of(func: &FuncDef) -> &crate::compiler::memory::Frame {
    func.frame
        .as_ref()
        .expect("function has no planned stack frame")
}

fn label_of(func: &FuncDef) -> &str {
    func.header
        .label
        .as_ref()
        .expect("function was not annotated by semantic analysis")
}

/// Strip parentheses off a by-reference argument down to the lvalue the
/// analyzer guaranteed is there.
fn ref_arg_lvalue(e: &Expr) -> &LValue {
    match &e.kind {
        ExprKind::LValue(lv) => lv,
        ExprKind::Paren(inner) => ref_arg_lvalue(inner),
        _ => panic!("by-reference argument is not an lvalue"),
    }
}

#[cfg(test)]
mod tests {
    use inkwell::context::Context;

    use crate::compiler::memory::plan_frames;
    use crate::compiler::parser::Parser;
    use crate::compiler::semantics::analyzer::analyze;
    use crate::compiler::Lexer;

    use super::*;

    fn ir_for(text: &str) -> String {
        let tokens = Lexer::new(text).tokenize().expect("Expected valid tokens");
        let mut prog = Parser::parse(&tokens).expect("Expected a valid program");
        analyze(&mut prog).expect("Expected a semantically valid program");
        plan_frames(&mut prog);

        let context = Context::create();
        let mut llvm = IrGen::new(&context, "test");
        llvm.ingest(&prog);
        llvm.verify().expect("Expected a well-formed module");
        llvm.llvm_ir_string()
    }

    #[test]
    fn empty_program_builds_main_wrapper() {
        let ir = ir_for("main () : proc {}");
        assert!(ir.contains("define void @root_main()"), "{}", ir);
        assert!(ir.contains("define i64 @main()"), "{}", ir);
        assert!(ir.contains("call void @root_main()"), "{}", ir);
    }

    #[test]
    fn library_externs_are_declared() {
        let ir = ir_for("main () : proc { writeInteger(42); }");
        assert!(ir.contains("declare void @writeInteger(i64)"), "{}", ir);
        assert!(ir.contains("call void @writeInteger(i64 42)"), "{}", ir);
    }

    #[test]
    fn nested_function_gets_an_access_link_parameter() {
        let ir = ir_for(
            "main () : proc
               var x : int;
               q () : proc { x := x + 1; }
             { q(); }",
        );
        // q takes its parent frame and reaches x through it.
        assert!(
            ir.contains("define void @root_main_q(%frame_root_main*"),
            "{}",
            ir
        );
        // The call from main passes main's own frame.
        assert!(
            ir.contains("call void @root_main_q(%frame_root_main* %frame)"),
            "{}",
            ir
        );
    }

    #[test]
    fn access_link_walks_two_levels() {
        let ir = ir_for(
            "main () : proc
               var x : int;
               p () : proc
                 q () : proc { x := x + 1; }
               { q(); }
             { p(); }",
        );
        assert!(
            ir.contains("define void @root_main_p_q(%frame_root_main_p*"),
            "{}",
            ir
        );
        // q finds x by loading its access link first.
        assert!(ir.contains("%frame_root_main_p = type"), "{}", ir);
    }

    #[test]
    fn string_literals_become_nul_terminated_globals() {
        let ir = ir_for("main () : proc { writeString(\"hi\"); }");
        assert!(ir.contains("c\"hi\\00\""), "{}", ir);
    }

    #[test]
    fn short_circuit_blocks_are_emitted() {
        let ir = ir_for(
            "main () : proc
               var x : int;
               divide (a, b : int) : int { return a / b; }
             { if (x = 0 or divide(10, x) > 0) x := 1; }",
        );
        for block in vec!["or_skip", "or_rhs", "or_end"] {
            assert!(ir.contains(block), "missing {} in {}", block, ir);
        }
        // The call to divide must sit in the skippable right-hand block.
        let rhs_pos = ir.find("or_rhs:").expect("rhs block label");
        let call_pos = ir.find("call i64 @root_main_divide").expect("divide call");
        assert!(call_pos > rhs_pos, "{}", ir);
    }

    #[test]
    fn local_arrays_allocate_backing_storage() {
        let ir = ir_for(
            "main () : proc
               var m : int[2][3];
             { m[1][2] := 5; }",
        );
        assert!(ir.contains("alloca [6 x i64]"), "{}", ir);
    }

    #[test]
    fn while_loop_reevaluates_its_condition() {
        let ir = ir_for(
            "main () : proc
               var x : int;
             { while (x < 3) x := x + 1; }",
        );
        for block in vec!["while_cond", "while_body", "while_end"] {
            assert!(ir.contains(block), "missing {} in {}", block, ir);
        }
    }

    #[test]
    fn open_array_argument_passes_the_base_pointer() {
        let ir = ir_for(
            "main () : proc
               var c : char[5];
               f (s : ref char[]) : proc {}
             { f(c); }",
        );
        assert!(
            ir.contains("define void @root_main_f(%frame_root_main*"),
            "{}",
            ir
        );
        assert!(ir.contains("i8*"), "{}", ir);
    }

    #[test]
    fn functions_returning_values_use_a_return_slot() {
        let ir = ir_for(
            "main () : proc
               f (n : int) : int { if (n > 0) return 1; else return 0; }
             { writeInteger(f(5)); }",
        );
        assert!(ir.contains("%retval = alloca i64"), "{}", ir);
        assert!(ir.contains("define i64 @root_main_f"), "{}", ir);
    }
}
