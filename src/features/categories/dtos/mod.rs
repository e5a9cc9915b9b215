mod category_dto;

pub use category_dto::{
    CategoryParentDto, CategoryQueryParams, CategoryResponseDto, CategoryTreeDto,
    CategoryTreeQuery, CreateCategoryDto, UpdateCategoryDto,
};
