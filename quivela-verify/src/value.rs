#![forbid(unsafe_code)]

use quivela_ast::Type;
use quivela_core::CheckError;

/// Sorts of the generated verification language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoogieType {
    Boolean,
    Opaque,
    Integer,
    ObjectId,
    Object,
    Memory,
    Heap,
    Real,
    Expr,
    Bitstring,
}

impl BoogieType {
    pub fn name(self) -> &'static str {
        match self {
            BoogieType::Boolean => "bool",
            BoogieType::Opaque => "T",
            BoogieType::Integer => "int",
            BoogieType::ObjectId => "ObjectId",
            BoogieType::Object => "Object",
            BoogieType::Memory => "Memory",
            BoogieType::Heap => "Heap",
            BoogieType::Real => "real",
            BoogieType::Expr => "Expr",
            BoogieType::Bitstring => "Bitstring",
        }
    }

    pub fn of(ty: Type) -> Self {
        match ty {
            Type::Bitstring => BoogieType::Bitstring,
            Type::Opaque => BoogieType::Opaque,
            Type::Integer => BoogieType::Integer,
            Type::Real => BoogieType::Real,
            Type::Map => BoogieType::Memory,
            Type::Expr => BoogieType::Expr,
        }
    }

    pub fn or_default(ty: Option<Type>, default: Type) -> Self {
        Self::of(ty.unwrap_or(default))
    }
}

/// A generated term together with its sort.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    pub ty: BoogieType,
    pub text: String,
}

impl Value {
    pub fn new(ty: BoogieType, text: impl Into<String>) -> Self {
        Self {
            ty,
            text: text.into(),
        }
    }

    pub fn opaque(text: impl Into<String>) -> Self {
        Self::new(BoogieType::Opaque, text)
    }

    pub fn boolean(text: impl Into<String>) -> Self {
        Self::new(BoogieType::Boolean, text)
    }

    pub fn integer(text: impl Into<String>) -> Self {
        Self::new(BoogieType::Integer, text)
    }

    /// The term coerced to `ty`.
    pub fn as_type(&self, ty: BoogieType) -> Result<String, CheckError> {
        if ty == self.ty {
            return Ok(self.text.clone());
        }
        match ty {
            BoogieType::Opaque => self.to_opaque(),
            BoogieType::Integer => self.to_integer(),
            BoogieType::Boolean => self.to_boolean(),
            BoogieType::Real => self.to_real(),
            BoogieType::Bitstring => self.to_bitstring(),
            BoogieType::Memory => self.to_memory(),
            BoogieType::ObjectId => self.to_object_id(),
            other => Err(CheckError::internal(format!(
                "cannot convert {} to {}",
                self.ty.name(),
                other.name()
            ))),
        }
    }

    pub fn to_integer(&self) -> Result<String, CheckError> {
        match self.ty {
            BoogieType::Integer => Ok(self.text.clone()),
            _ => Ok(format!("toInt({})", self.to_bitstring()?)),
        }
    }

    pub fn to_boolean(&self) -> Result<String, CheckError> {
        match self.ty {
            BoogieType::Boolean => Ok(self.text.clone()),
            _ => Ok(format!("{}!=nil", self.to_bitstring()?)),
        }
    }

    pub fn to_opaque(&self) -> Result<String, CheckError> {
        match self.ty {
            BoogieType::Opaque => Ok(self.text.clone()),
            BoogieType::ObjectId => Ok(format!("fromObjectId({})", self.text)),
            BoogieType::Memory => Ok(format!("fromMemory({})", self.text)),
            BoogieType::Expr => Ok(format!("fromExpr({})", self.text)),
            _ => Ok(format!("fromBitstring({})", self.to_bitstring()?)),
        }
    }

    pub fn to_bitstring(&self) -> Result<String, CheckError> {
        match self.ty {
            BoogieType::Bitstring => Ok(self.text.clone()),
            BoogieType::Opaque => Ok(format!("toBitstring({})", self.text)),
            BoogieType::Boolean => Ok(format!("fromBool({})", self.text)),
            BoogieType::Integer => Ok(format!("fromInt({})", self.text)),
            BoogieType::Real => Ok(format!("fromReal({})", self.text)),
            other => Err(CheckError::internal(format!(
                "cannot convert {} to Bitstring",
                other.name()
            ))),
        }
    }

    pub fn to_object_id(&self) -> Result<String, CheckError> {
        match self.ty {
            BoogieType::ObjectId => Ok(self.text.clone()),
            _ => Ok(format!("toObjectId({})", self.to_opaque()?)),
        }
    }

    pub fn to_memory(&self) -> Result<String, CheckError> {
        match self.ty {
            BoogieType::Object => Ok(format!("{}[objectMemoryAttr]", self.text)),
            BoogieType::Memory => Ok(self.text.clone()),
            _ => Ok(format!("toMemory({})", self.to_opaque()?)),
        }
    }

    pub fn to_real(&self) -> Result<String, CheckError> {
        match self.ty {
            BoogieType::Real => Ok(self.text.clone()),
            BoogieType::Integer => Ok(format!("real({})", self.text)),
            _ => Ok(format!("toReal({})", self.to_bitstring()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_become_opaque_through_bitstrings() {
        let v = Value::integer("1");
        assert_eq!(v.to_opaque().unwrap(), "fromBitstring(fromInt(1))");
        assert_eq!(v.as_type(BoogieType::Real).unwrap(), "real(1)");
        assert_eq!(v.as_type(BoogieType::Integer).unwrap(), "1");
    }

    #[test]
    fn objects_expose_their_memory() {
        let v = Value::new(BoogieType::Object, "o");
        assert_eq!(v.to_memory().unwrap(), "o[objectMemoryAttr]");
        assert!(v.to_bitstring().is_err());
    }

    #[test]
    fn truth_of_opaque_values_is_non_nil() {
        assert_eq!(
            Value::opaque("x").to_boolean().unwrap(),
            "toBitstring(x)!=nil"
        );
    }
}
