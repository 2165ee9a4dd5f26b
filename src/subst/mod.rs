//! Constant-value propagation and substitution
//!
//! The engine discovers which value holders (locals, parameters, fields,
//! properties, return slots, array lengths) can only ever hold one
//! statically-known value, replaces their uses with that literal, and
//! iterates to a fixed point. Four passes run in sequence over one
//! program unit at a time:
//!
//! - **marking**: local discovery of foldable expressions and candidate
//!   bindings
//! - **constructor specialization**: per-instance clones of constructors
//!   invoked with constant arguments
//! - **global holders**: the stricter single-consistent-value rule for
//!   parameters, members, and return slots
//! - **substitution**: the in-place rewrite, with scope-exit invalidation
//!
//! The loop repeats until the tree's printed form stops changing and no
//! pass reports an update, bounded by a fixed pass cap. The engine only
//! ever removes the need to store a value; when in doubt a holder stays
//! non-constant.

pub mod array_size;
pub mod ctor_map;
pub mod eval;
pub mod globals;
pub mod marking;
pub mod substitute;
pub mod table;

pub use array_size::ArraySizeTable;
pub use ctor_map::{SpecializationMap, SpecializedConstructor};
pub use table::{ConstantTable, HolderName};

use crate::ast::{
    AstPrinter, Block, ClassMember, ConstructorDecl, Expr, NodeId, Parameter,
    ScopeId, Stmt, SyntaxTree, TypeRef,
};
use crate::config::SubstitutionConfig;
use crate::error::{Error, Result};
use crate::registry::TypeRegistry;
use rustc_hash::FxHashMap;

use ctor_map::ConstructorSpecializer;
use globals::GlobalHolderPass;
use marking::MarkingPass;
use substitute::SubstitutionPass;
use table::NameScope;

/// Traversal context shared by the passes: the enclosing class and
/// method, the live scope stack, declared types of in-scope locals, and
/// how deeply the walk sits inside conditionals, loops, and mutating
/// operators
pub(crate) struct WalkCtx<'a> {
    pub class: &'a str,
    pub method: Option<&'a str>,
    pub scopes: Vec<ScopeId>,
    pub locals: FxHashMap<String, TypeRef>,
    pub conditional_depth: usize,
    pub loop_depth: usize,
    pub mutating_depth: usize,
    pub in_constructor: bool,
}

impl<'a> WalkCtx<'a> {
    pub fn at_class_level(class: &'a str) -> Self {
        Self {
            class,
            method: None,
            scopes: vec![ScopeId::ROOT],
            locals: FxHashMap::default(),
            conditional_depth: 0,
            loop_depth: 0,
            mutating_depth: 0,
            in_constructor: false,
        }
    }

    pub fn in_method(class: &'a str, method: &'a str, parameters: &[Parameter]) -> Self {
        let locals = parameters
            .iter()
            .map(|p| (p.name.clone(), p.type_ref.clone()))
            .collect();
        Self {
            class,
            method: Some(method),
            scopes: vec![ScopeId::ROOT],
            locals,
            conditional_depth: 0,
            loop_depth: 0,
            mutating_depth: 0,
            in_constructor: false,
        }
    }

    pub fn current_scope(&self) -> ScopeId {
        self.scopes.last().copied().unwrap_or(ScopeId::ROOT)
    }

    pub fn name_scope(&self) -> NameScope<'_> {
        NameScope::new(self.class, self.method)
    }

    pub fn in_branch(&self) -> bool {
        self.conditional_depth > 0 || self.loop_depth > 0
    }
}

/// Numbering walk assigning stable identities to binding scopes and to
/// operation nodes. Runs once at the start of each driver invocation;
/// constructor clones are re-numbered before their recursive run.
struct Numberer {
    next_scope: u32,
    next_node: u32,
}

impl Numberer {
    fn new() -> Self {
        Self { next_scope: 1, next_node: 1 }
    }

    fn number_tree(&mut self, tree: &mut SyntaxTree) {
        for class in &mut tree.classes {
            for member in &mut class.members {
                match member {
                    ClassMember::Field(field) => {
                        if let Some(ref mut initializer) = field.initializer {
                            self.number_expr(initializer);
                        }
                    }
                    ClassMember::Property(property) => {
                        if let Some(ref mut initializer) = property.initializer {
                            self.number_expr(initializer);
                        }
                    }
                    ClassMember::Method(method) => {
                        for parameter in &mut method.parameters {
                            if let Some(ref mut default_value) = parameter.default_value {
                                self.number_expr(default_value);
                            }
                        }
                        if let Some(ref mut body) = method.body {
                            self.number_block(body);
                        }
                    }
                    ClassMember::Constructor(constructor) => {
                        self.number_constructor(constructor);
                    }
                }
            }
        }
    }

    fn number_constructor(&mut self, constructor: &mut ConstructorDecl) {
        for parameter in &mut constructor.parameters {
            if let Some(ref mut default_value) = parameter.default_value {
                self.number_expr(default_value);
            }
        }
        self.number_block(&mut constructor.body);
    }

    fn number_block(&mut self, block: &mut Block) {
        block.scope_id = ScopeId(self.next_scope);
        self.next_scope += 1;
        for stmt in &mut block.statements {
            self.number_stmt(stmt);
        }
    }

    fn number_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Expression(expr_stmt) => self.number_expr(&mut expr_stmt.expr),
            Stmt::Declaration(var_decl) => {
                for var in &mut var_decl.variables {
                    if let Some(ref mut initializer) = var.initializer {
                        self.number_expr(initializer);
                    }
                }
            }
            Stmt::If(if_stmt) => {
                self.number_expr(&mut if_stmt.condition);
                self.number_stmt(&mut if_stmt.then_branch);
                if let Some(ref mut else_branch) = if_stmt.else_branch {
                    self.number_stmt(else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                self.number_expr(&mut while_stmt.condition);
                self.number_stmt(&mut while_stmt.body);
            }
            Stmt::For(for_stmt) => {
                for init in &mut for_stmt.init {
                    self.number_stmt(init);
                }
                if let Some(ref mut condition) = for_stmt.condition {
                    self.number_expr(condition);
                }
                for update in &mut for_stmt.update {
                    self.number_expr(update);
                }
                self.number_stmt(&mut for_stmt.body);
            }
            Stmt::Return(return_stmt) => {
                if let Some(ref mut value) = return_stmt.value {
                    self.number_expr(value);
                }
            }
            Stmt::Block(block) => self.number_block(block),
            Stmt::Empty => {}
        }
    }

    fn number_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Binary(binary) => {
                binary.id = NodeId(self.next_node);
                self.next_node += 1;
                self.number_expr(&mut binary.left);
                self.number_expr(&mut binary.right);
            }
            Expr::Unary(unary) => {
                unary.id = NodeId(self.next_node);
                self.next_node += 1;
                self.number_expr(&mut unary.operand);
            }
            Expr::Assignment(assignment) => {
                self.number_expr(&mut assignment.target);
                self.number_expr(&mut assignment.value);
            }
            Expr::Invocation(invocation) => {
                if let Some(ref mut target) = invocation.target {
                    self.number_expr(target);
                }
                for arg in &mut invocation.arguments {
                    self.number_expr(arg);
                }
            }
            Expr::MemberAccess(member_access) => {
                self.number_expr(&mut member_access.target)
            }
            Expr::IndexAccess(index_access) => {
                self.number_expr(&mut index_access.array);
                self.number_expr(&mut index_access.index);
            }
            Expr::Cast(cast) => self.number_expr(&mut cast.expr),
            Expr::ObjectCreation(creation) => {
                for arg in &mut creation.arguments {
                    self.number_expr(arg);
                }
            }
            Expr::ArrayCreation(creation) => self.number_expr(&mut creation.length),
            Expr::Parenthesized(inner) => self.number_expr(inner),
            Expr::Literal(_) | Expr::Identifier(_) | Expr::ThisRef(_) => {}
        }
    }
}

/// Driver for one program unit: runs the four passes in a bounded
/// fixpoint loop and owns the engine's working state
pub struct ConstantSubstitution<'a> {
    registry: &'a TypeRegistry,
    config: SubstitutionConfig,
    table: ConstantTable,
    snapshot: ConstantTable,
    sizes: ArraySizeTable,
    specializations: SpecializationMap,
    depth: usize,
}

impl<'a> ConstantSubstitution<'a> {
    pub fn new(registry: &'a TypeRegistry, config: SubstitutionConfig) -> Self {
        Self {
            registry,
            config,
            table: ConstantTable::new(),
            snapshot: ConstantTable::new(),
            sizes: ArraySizeTable::new(),
            specializations: SpecializationMap::default(),
            depth: 0,
        }
    }

    /// Rewrite a whole tree in place until it stabilizes
    pub fn process(&mut self, tree: &mut SyntaxTree) -> Result<()> {
        Numberer::new().number_tree(tree);

        let unit = tree
            .classes
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "<empty tree>".to_string());

        let mut previous = String::new();
        for pass_number in 1..=self.config.max_passes {
            let mut updates = 0;
            updates +=
                MarkingPass::new(self.registry, &mut self.table, &mut self.sizes)
                    .run_tree(tree)?;
            updates += ConstructorSpecializer::new(
                self.registry,
                &mut self.specializations,
                &self.config,
                self.depth,
            )
            .run_tree(tree)?;
            GlobalHolderPass::new(self.registry, &mut self.table, ScopeId::ROOT)
                .run_tree(tree)?;
            updates += SubstitutionPass::new(
                self.registry,
                &mut self.table,
                &mut self.sizes,
                &self.specializations,
            )
            .run_tree(tree)?;

            let form = AstPrinter::new().print(tree);
            let stable = updates == 0 && form == previous;
            self.reset_table();
            tracing::debug!(unit = %unit, pass = pass_number, updates, stable, "pass complete");
            if stable {
                return Ok(());
            }
            previous = form;
        }
        Err(Error::non_convergence(unit, self.config.max_passes))
    }

    /// The populated array-length table, consumed by the downstream
    /// hardware-description generator to size fixed-length constructs
    pub fn into_array_sizes(self) -> ArraySizeTable {
        self.sizes
    }

    /// Run the fixpoint over a single constructor clone under a
    /// pre-seeded table. The seed is restored after every pass so the
    /// argument bindings survive without leaking anything back into the
    /// caller's table.
    pub(crate) fn specialize_constructor(
        registry: &TypeRegistry,
        class: &str,
        constructor: &mut ConstructorDecl,
        seeded: ConstantTable,
        config: &SubstitutionConfig,
        depth: usize,
    ) -> Result<()> {
        let mut engine = ConstantSubstitution {
            registry,
            config: SubstitutionConfig {
                restore_bindings: true,
                max_passes: config.max_passes,
            },
            table: seeded.clone(),
            snapshot: seeded,
            sizes: ArraySizeTable::new(),
            specializations: SpecializationMap::default(),
            depth,
        };
        Numberer::new().number_constructor(constructor);

        let unit = format!("{}.{}()", class, constructor.name);
        let mut previous = String::new();
        for pass_number in 1..=engine.config.max_passes {
            let mut updates = 0;
            updates +=
                MarkingPass::new(engine.registry, &mut engine.table, &mut engine.sizes)
                    .run_constructor(class, constructor)?;
            updates += ConstructorSpecializer::new(
                engine.registry,
                &mut engine.specializations,
                &engine.config,
                engine.depth,
            )
            .run_constructor(class, constructor)?;
            GlobalHolderPass::new(engine.registry, &mut engine.table, ScopeId::ROOT)
                .run_constructor(class, constructor)?;
            updates += SubstitutionPass::new(
                engine.registry,
                &mut engine.table,
                &mut engine.sizes,
                &engine.specializations,
            )
            .run_constructor(class, constructor)?;

            let form = AstPrinter::new().print_constructor(constructor);
            let stable = updates == 0 && form == previous;
            engine.reset_table();
            tracing::debug!(unit = %unit, pass = pass_number, updates, stable, "specialization pass complete");
            if stable {
                return Ok(());
            }
            previous = form;
        }
        Err(Error::non_convergence(unit, config.max_passes))
    }

    /// After each pass the table is cleared for an independent run, or
    /// restored to the caller's snapshot when iterating a seeded clone
    fn reset_table(&mut self) {
        if self.config.restore_bindings {
            self.table = self.snapshot.clone();
        } else {
            self.table.clear();
        }
    }
}
