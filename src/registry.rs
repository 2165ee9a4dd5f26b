//! Type-declaration lookup table
//!
//! Resolves a member reference to its declaring entity: field and property
//! types with their read-only flags, method signatures, and constructor
//! declarations. The upstream front end may supply its own table; callers
//! without one derive it from the tree with [`TypeRegistry::build`].

use crate::ast::{
    ClassMember, ConstructorDecl, Expr, Modifier, SyntaxTree, TypeRef,
};
use rustc_hash::FxHashMap;

/// Normalize equivalent member access paths to one identity: a property
/// and its compiler-generated backing field resolve to the same name, and
/// accessor methods resolve to the property they wrap.
pub fn normalize_member_name(name: &str) -> &str {
    if let Some(stripped) = name.strip_prefix('<') {
        if let Some(end) = stripped.find(">k__BackingField") {
            return &stripped[..end];
        }
    }
    if let Some(stripped) = name.strip_prefix("get_") {
        return stripped;
    }
    if let Some(stripped) = name.strip_prefix("set_") {
        return stripped;
    }
    name
}

/// Declared field or property
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub type_ref: TypeRef,
    /// Read-only field, or property without a setter; such members are
    /// only ever written during construction
    pub read_only: bool,
}

/// Declared method signature
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub parameters: Vec<(String, TypeRef)>,
    pub return_type: Option<TypeRef>,
}

/// Everything known about one declared class
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub members: FxHashMap<String, MemberInfo>,
    pub methods: FxHashMap<String, MethodInfo>,
    /// Owned copies of the constructor declarations, so specialization can
    /// clone them while the tree itself is being rewritten
    pub constructors: Vec<ConstructorDecl>,
}

/// Lookup table from class and member names to declaring entities
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    classes: FxHashMap<String, ClassInfo>,
}

impl TypeRegistry {
    /// Build the lookup table from a tree
    pub fn build(tree: &SyntaxTree) -> Self {
        let mut classes = FxHashMap::default();

        for class in &tree.classes {
            let mut members = FxHashMap::default();
            let mut methods = FxHashMap::default();
            let mut constructors = Vec::new();

            for member in &class.members {
                match member {
                    ClassMember::Field(field) => {
                        members.insert(
                            normalize_member_name(&field.name).to_string(),
                            MemberInfo {
                                type_ref: field.type_ref.clone(),
                                read_only: field.modifiers.contains(&Modifier::ReadOnly),
                            },
                        );
                    }
                    ClassMember::Property(property) => {
                        members.insert(
                            normalize_member_name(&property.name).to_string(),
                            MemberInfo {
                                type_ref: property.type_ref.clone(),
                                read_only: !property.has_setter,
                            },
                        );
                    }
                    ClassMember::Method(method) => {
                        methods.insert(
                            method.name.clone(),
                            MethodInfo {
                                parameters: method
                                    .parameters
                                    .iter()
                                    .map(|p| (p.name.clone(), p.type_ref.clone()))
                                    .collect(),
                                return_type: method.return_type.clone(),
                            },
                        );
                    }
                    ClassMember::Constructor(constructor) => {
                        constructors.push(constructor.clone());
                    }
                }
            }

            classes.insert(
                class.name.clone(),
                ClassInfo {
                    name: class.name.clone(),
                    members,
                    methods,
                    constructors,
                },
            );
        }

        Self { classes }
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn member(&self, class: &str, member: &str) -> Option<&MemberInfo> {
        self.classes
            .get(class)?
            .members
            .get(normalize_member_name(member))
    }

    pub fn method(&self, class: &str, name: &str) -> Option<&MethodInfo> {
        self.classes.get(class)?.methods.get(name)
    }

    /// Constructor of `class` with the given parameter count. Overload
    /// resolution proper is the front end's job; decompiled input keys
    /// constructors unambiguously by arity.
    pub fn constructor(&self, class: &str, arity: usize) -> Option<&ConstructorDecl> {
        self.classes
            .get(class)?
            .constructors
            .iter()
            .find(|c| c.parameters.len() == arity)
    }

    /// Static type of an expression, as far as declared annotations allow.
    /// `locals` maps in-scope variable and parameter names to their
    /// declared types; `class` is the enclosing class.
    pub fn static_type_of(
        &self,
        expr: &Expr,
        class: &str,
        locals: &FxHashMap<String, TypeRef>,
    ) -> Option<TypeRef> {
        match expr {
            Expr::Identifier(identifier) => {
                if let Some(type_ref) = locals.get(&identifier.name) {
                    return Some(type_ref.clone());
                }
                self.member(class, &identifier.name)
                    .map(|m| m.type_ref.clone())
            }
            Expr::ThisRef(_) => Some(TypeRef::new(class)),
            Expr::MemberAccess(member_access) => {
                let target_type =
                    self.static_type_of(&member_access.target, class, locals)?;
                if target_type.is_array() {
                    return None;
                }
                self.member(&target_type.name, &member_access.member)
                    .map(|m| m.type_ref.clone())
            }
            Expr::IndexAccess(index_access) => {
                let array_type = self.static_type_of(&index_access.array, class, locals)?;
                if array_type.array_dims == 0 {
                    return None;
                }
                Some(TypeRef::array(array_type.name, array_type.array_dims - 1))
            }
            Expr::Invocation(invocation) => {
                let callee_class = match invocation.target {
                    Some(ref target) => {
                        self.static_type_of(target, class, locals)?.name
                    }
                    None => class.to_string(),
                };
                self.method(&callee_class, &invocation.method)?
                    .return_type
                    .clone()
            }
            Expr::Cast(cast) => Some(cast.target_type.clone()),
            Expr::ObjectCreation(creation) => Some(creation.target_type.clone()),
            Expr::ArrayCreation(creation) => Some(TypeRef::array(
                creation.element_type.name.clone(),
                creation.element_type.array_dims + 1,
            )),
            Expr::Parenthesized(inner) => self.static_type_of(inner, class, locals),
            _ => None,
        }
    }
}
